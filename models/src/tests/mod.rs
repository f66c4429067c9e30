mod document;
mod launch;
mod library;
