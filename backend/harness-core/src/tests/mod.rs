mod channel;
mod codec;
mod driver;
mod supervisor;
