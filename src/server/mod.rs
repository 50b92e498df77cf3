pub mod acceptor;
pub mod worker;
