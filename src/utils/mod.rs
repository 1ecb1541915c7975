use tokio::sync::mpsc::UnboundedSender;

#[macro_export]
macro_rules! ensure {
    ($cond:expr) => {
        if !($cond) {
            return None;
        }
    };
    ($cond:expr, $err:expr) => {
        if !($cond) {
            return Err($err.into());
        }
    };
}

pub trait SliceExt<T> {
    fn get_chunk<const N: usize>(&self, index: usize) -> Option<&[T; N]>;
}

impl<T> SliceExt<T> for [T] {
    fn get_chunk<const N: usize>(&self, index: usize) -> Option<&[T; N]> {
        self.get(index..)
            .and_then(|slice| slice.split_first_chunk().map(|(a, _)| a))
    }
}

pub trait DispatchExt<T> {
    /// Sends `value` to every subscriber, pruning the ones that hung up.
    /// Returns whether at least one subscriber is still listening.
    fn dispatch(&mut self, value: T) -> bool;
}

impl<T: Clone> DispatchExt<T> for Vec<UnboundedSender<T>> {
    fn dispatch(&mut self, value: T) -> bool {
        let mut values = std::iter::repeat_n(value, self.len());
        self.retain_mut(|tx| tx.send(values.next().unwrap()).is_ok());
        !self.is_empty()
    }
}
