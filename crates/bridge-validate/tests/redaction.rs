//! Log output of failing rules, captured in memory.
//!
//! Record logging stays at its default (off) for the whole binary.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use anyhow::bail;
use bridge_model::DataSet;
use bridge_validate::{Validator, Verdict, rule_fn};
use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for Captured {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn capture() -> (Captured, tracing::subscriber::DefaultGuard) {
    let captured = Captured::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(captured.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (captured, guard)
}

#[tokio::test]
async fn rule_error_is_logged_redacted() {
    let (captured, _guard) = capture();
    let validator = Validator::new()
        .with_rule(rule_fn(
            "ssn-format",
            |ds: &DataSet<String>| -> anyhow::Result<Verdict> {
                bail!("cannot parse ssn {}", ds.objects())
            },
        ))
        .unwrap();

    let mut ds = DataSet::new("123-45-6789".to_string());
    let result = validator.validate(&mut ds).await;

    assert!(!result.passed());
    // The outcome keeps the detail; only the log line is masked.
    assert_eq!(
        result.entry("ssn-format").unwrap().message(),
        Some("rule raised an error: cannot parse ssn 123-45-6789")
    );
    let output = captured.contents();
    assert!(output.contains("rule raised an error"), "{output}");
    assert!(output.contains("[REDACTED]"), "{output}");
    assert!(!output.contains("123-45-6789"), "{output}");
}

#[tokio::test]
async fn rule_panic_is_logged_redacted() {
    let (captured, _guard) = capture();
    let validator = Validator::new()
        .with_rule(rule_fn(
            "ssn-checksum",
            |ds: &DataSet<String>| -> anyhow::Result<Verdict> {
                panic!("bad checksum in {}", ds.objects())
            },
        ))
        .unwrap();

    let result = validator
        .evaluate(&DataSet::new("987-65-4321".to_string()))
        .await;

    assert!(!result.passed());
    let output = captured.contents();
    assert!(output.contains("rule panicked"), "{output}");
    assert!(!output.contains("987-65-4321"), "{output}");
}
