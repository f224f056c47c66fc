//! Backend event demultiplexing into client messages.

mod dispatcher;

pub use dispatcher::ResponseDispatcher;
