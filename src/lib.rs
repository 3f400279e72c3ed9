/*
    ABD emulates a single-writer/multi-reader atomic register on top of an
    asynchronous message-passing system of N replicas, of which up to f may
    crash, as long as N > 2f.

    Every replica keeps a (value, timestamp) pair and answers two requests
    from anyone at any time: a read, which returns the pair, and a write,
    which replaces the pair if the proposed one is more recent. To perform
    an operation a replica first reads from a majority, then imposes a pair
    on a majority. A Put imposes its own value with a timestamp one past
    the highest it read; a Get imposes the most recent pair it read, so a
    later operation can never observe an older value. Any two majorities
    intersect, which is what makes the emulated register atomic.
*/

pub mod common;
pub mod network;
pub mod register;
