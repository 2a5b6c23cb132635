//! Helpers for asserting on log output.
//!
//! Used to check that secrets never reach a log line.

#[cfg(any(test, feature = "tests"))]
pub mod test_helpers {
    use std::fmt::Display;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Debug, Default)]
    pub struct CollectingWriter {
        buffer: Arc<Mutex<Vec<u8>>>,
    }

    impl Display for CollectingWriter {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            let buffer = self.buffer.lock().unwrap();
            let str_content = String::from_utf8_lossy(&buffer);
            write!(f, "{str_content}")
        }
    }

    impl<'w> tracing_subscriber::fmt::MakeWriter<'w> for CollectingWriter {
        type Writer = <Mutex<Vec<u8>> as tracing_subscriber::fmt::MakeWriter<'w>>::Writer;

        fn make_writer(&'w self) -> Self::Writer {
            (*self.buffer).make_writer()
        }
    }

    /// A subscriber recording every event, down to `TRACE`, into a
    /// [CollectingWriter].
    pub fn test_subscriber() -> (impl tracing::Subscriber, CollectingWriter) {
        let writer = CollectingWriter::default();

        let subscriber = tracing_subscriber::fmt()
            .with_writer(writer.clone())
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .compact()
            .without_time()
            .with_level(false)
            .with_target(false)
            .finish();

        (subscriber, writer)
    }
}
