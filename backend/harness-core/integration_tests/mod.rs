mod helpers;

mod codec;
mod config;
mod executor;
mod session;
mod supervisor;
