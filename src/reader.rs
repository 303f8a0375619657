// ABOUTME: Iterator over consecutive top-level values of a MessagePack stream.
// ABOUTME: Each item is one fully materialized Value.

use crate::decoder::Decoder;
use crate::error::{Error, Result};
use crate::io::ByteSource;
use crate::value::Value;

/// Yields one [`Value`] per top-level value in the stream.
///
/// Iteration ends cleanly when the source is exhausted at a value boundary.
/// Over a [`FeedSource`](crate::io::FeedSource) that has not been closed,
/// iteration also pauses (returns `None`) when no complete value is buffered;
/// feed more input through [`decoder_mut`](Self::decoder_mut) and iterate
/// again to continue. Any other error is yielded once, after which the
/// iterator is fused.
pub struct ValueReader<S: ByteSource> {
    decoder: Decoder<S>,
    done: bool,
}

impl<S: ByteSource> ValueReader<S> {
    pub fn new(source: S) -> Self {
        Self::from_decoder(Decoder::new(source))
    }

    /// Wrap an existing decoder, e.g. one built with a custom configuration.
    pub fn from_decoder(decoder: Decoder<S>) -> Self {
        Self { decoder, done: false }
    }

    pub fn decoder(&self) -> &Decoder<S> {
        &self.decoder
    }

    pub fn decoder_mut(&mut self) -> &mut Decoder<S> {
        &mut self.decoder
    }

    pub fn into_decoder(self) -> Decoder<S> {
        self.decoder
    }
}

impl<S: ByteSource> Iterator for ValueReader<S> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.decoder.is_at_end() {
            Ok(true) => {
                self.done = true;
                return None;
            }
            Ok(false) => {}
            Err(Error::WouldBlock) => return None,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        }
        match self.decoder.read_value() {
            Ok(value) => Some(Ok(value)),
            Err(Error::WouldBlock) => None,
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{FeedSource, SliceSource};

    #[test]
    fn test_reads_consecutive_values() {
        let bytes = [0x01, 0x92, 0xc0, 0xc3, 0xa1, b'z'];
        let values: Vec<Value> = ValueReader::new(SliceSource::new(&bytes))
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(
            values,
            vec![
                Value::Int(1),
                Value::Array(vec![Value::Nil, Value::Bool(true)]),
                Value::Raw(b"z".to_vec()),
            ]
        );
    }

    #[test]
    fn test_empty_stream() {
        let mut reader = ValueReader::new(SliceSource::new(&[]));
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_truncated_value_errors_once() {
        let mut reader = ValueReader::new(SliceSource::new(&[0x01, 0x92, 0x01]));
        assert_eq!(reader.next(), Some(Ok(Value::Int(1))));
        assert_eq!(reader.next(), Some(Err(Error::IncompleteInput)));
        assert_eq!(reader.next(), None);
    }

    #[test]
    fn test_pauses_on_partial_feed() {
        let mut reader = ValueReader::new(FeedSource::new());
        reader.decoder_mut().source_mut().feed(&[0x05, 0x92, 0x01]);
        assert_eq!(reader.next(), Some(Ok(Value::Int(5))));
        assert_eq!(reader.next(), None);

        reader.decoder_mut().source_mut().feed(&[0x02]);
        reader.decoder_mut().source_mut().close();
        assert_eq!(
            reader.next(),
            Some(Ok(Value::Array(vec![Value::Int(1), Value::Int(2)])))
        );
        assert_eq!(reader.next(), None);
    }
}
