//! Cluster progress reporting.
//!
//! Fire-and-forget text updates about the current item ("Setting up …",
//! "Processing …", "Cleaning …"). Delivery failures must never affect the
//! job, so the trait is infallible by construction.

/// Free-form progress sink.
pub trait ProgressReporter {
    fn report(&self, message: &str);
}

/// Default reporter: routes updates to the log.
#[derive(Debug, Default)]
pub struct LogReporter;

impl ProgressReporter for LogReporter {
    fn report(&self, message: &str) {
        tracing::info!("{message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct Recorder(RefCell<Vec<String>>);

    impl ProgressReporter for Recorder {
        fn report(&self, message: &str) {
            self.0.borrow_mut().push(message.to_owned());
        }
    }

    #[test]
    fn reporters_are_object_safe() {
        let recorder = Recorder(RefCell::new(Vec::new()));
        let dyn_reporter: &dyn ProgressReporter = &recorder;
        dyn_reporter.report("Processing 20-01-10");
        assert_eq!(recorder.0.borrow().len(), 1);
    }
}
