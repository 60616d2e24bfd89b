use std::{thread, time::Duration};

/// A fixed real-time wait.
///
/// Neither flow coordinates with the other; each only ever blocks here.
pub trait Pause {
    fn pause(&mut self, dur: Duration);
}

/// Blocks the calling thread with [`thread::sleep`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleep;

impl Pause for ThreadSleep {
    fn pause(&mut self, dur: Duration) {
        thread::sleep(dur);
    }
}

impl<P> Pause for &mut P
where
    P: Pause + ?Sized,
{
    fn pause(&mut self, dur: Duration) {
        (**self).pause(dur);
    }
}
