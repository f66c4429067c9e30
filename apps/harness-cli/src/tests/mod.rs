mod cli;
mod logger;
