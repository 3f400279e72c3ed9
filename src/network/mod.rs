pub mod cluster;
pub mod node;

pub use cluster::*;
pub use node::*;

/*
    Communication is point-to-point and asynchronous. Each replica owns an
    unbounded inbox; a send never blocks the sender and is delivered at most
    once. Nothing is assumed about ordering between different senders or
    about delay. A crashed replica closes its inbox, so messages addressed
    to it are simply lost. When we refer to a "broadcast", it involves the
    broadcaster sending the same point-to-point message to every replica in
    the roster, itself included.
*/
