//! Adapters that turn an expression classifier into per-tick readings.
//!
//! Frame capture and inference live outside this crate; adapters only hand the
//! session the most recent `(label, confidence)` pair, or nothing.

use crate::catalog::ChallengeCatalog;
use crate::error::{ClassifierError, ClassifierResult};
use crate::matcher::ClassificationReading;
use std::collections::VecDeque;
use std::ffi::OsStr;
use std::io::{BufRead, BufReader};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use tracing::{debug, warn};

/// Source of classifier readings, polled at most once per tick.
///
/// `Ok(None)` means nothing new was produced this tick. `Err` means the adapter
/// failed; the session logs it and skips evaluation for the tick.
pub trait Classifier {
    fn classify(&mut self) -> ClassifierResult<Option<ClassificationReading>>;
}

impl<C: Classifier + ?Sized> Classifier for Box<C> {
    fn classify(&mut self) -> ClassifierResult<Option<ClassificationReading>> {
        (**self).classify()
    }
}

/// Replays a fixed list of results, then reports nothing.
#[derive(Debug, Default)]
pub struct ScriptedClassifier {
    script: VecDeque<ClassifierResult<Option<ClassificationReading>>>,
    calls: usize,
}

impl ScriptedClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_reading(&mut self, label: &str, confidence: f64) -> &mut Self {
        self.script
            .push_back(Ok(Some(ClassificationReading::new(label, confidence))));
        self
    }

    pub fn push_none(&mut self) -> &mut Self {
        self.script.push_back(Ok(None));
        self
    }

    pub fn push_error(&mut self, err: ClassifierError) -> &mut Self {
        self.script.push_back(Err(err));
        self
    }

    /// Number of times the session has polled this adapter.
    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl Classifier for ScriptedClassifier {
    fn classify(&mut self) -> ClassifierResult<Option<ClassificationReading>> {
        self.calls += 1;
        self.script.pop_front().unwrap_or(Ok(None))
    }
}

/// Stand-in for a camera: number keys pick an expression from the catalog.
#[derive(Debug, Clone)]
pub struct KeyboardClassifier {
    labels: Vec<String>,
    pending: Option<String>,
}

impl KeyboardClassifier {
    pub fn new(catalog: &ChallengeCatalog) -> Self {
        Self {
            labels: catalog.ids().to_vec(),
            pending: None,
        }
    }

    /// Register a key press. Returns true if the key maps to an expression.
    pub fn press(&mut self, key: char) -> bool {
        let label = key
            .to_digit(10)
            .filter(|d| *d > 0)
            .and_then(|d| self.labels.get(d as usize - 1));
        match label {
            Some(label) => {
                self.pending = Some(label.clone());
                true
            }
            None => false,
        }
    }

    /// Drop a press that has not been polled yet.
    pub fn clear(&mut self) {
        self.pending = None;
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

impl Classifier for KeyboardClassifier {
    fn classify(&mut self) -> ClassifierResult<Option<ClassificationReading>> {
        Ok(self
            .pending
            .take()
            .map(|label| ClassificationReading::new(label, 1.0)))
    }
}

/// Reads `<label> <confidence>` lines on a background thread and serves the
/// latest one each tick. Older unread readings are dropped.
#[derive(Debug)]
pub struct LineClassifier {
    rx: Receiver<ClassificationReading>,
    disconnected: bool,
    child: Option<Child>,
}

impl LineClassifier {
    pub fn from_reader<R: BufRead + Send + 'static>(reader: R) -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || {
            for line in reader.lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        warn!(error = %e, "classifier stream read failed");
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<ClassificationReading>() {
                    Ok(reading) => {
                        if tx.send(reading).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!(error = %e, "skipping classifier line"),
                }
            }
            debug!("classifier stream closed");
        });

        Self {
            rx,
            disconnected: false,
            child: None,
        }
    }

    /// Spawn `program` with `args` passed through verbatim and read readings
    /// from its stdout.
    pub fn spawn_command<S: AsRef<OsStr>>(program: &str, args: &[S]) -> ClassifierResult<Self> {
        if program.trim().is_empty() {
            return Err(ClassifierError::Malformed("empty classifier command".into()));
        }

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;
        let stdout = child.stdout.take().ok_or(ClassifierError::Disconnected)?;

        let mut this = Self::from_reader(BufReader::new(stdout));
        this.child = Some(child);
        Ok(this)
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }
}

impl Classifier for LineClassifier {
    fn classify(&mut self) -> ClassifierResult<Option<ClassificationReading>> {
        let mut latest = None;
        loop {
            match self.rx.try_recv() {
                Ok(reading) => latest = Some(reading),
                Err(TryRecvError::Empty) => return Ok(latest),
                Err(TryRecvError::Disconnected) => {
                    self.disconnected = true;
                    return match latest {
                        Some(reading) => Ok(Some(reading)),
                        None => Err(ClassifierError::Disconnected),
                    };
                }
            }
        }
    }
}

/// Consumes one line of a recorded trace per poll. A blank line or `-` means
/// no reading for that poll; end of input reports a disconnect.
#[derive(Debug)]
pub struct ReplayClassifier<R: BufRead> {
    reader: R,
    exhausted: bool,
}

impl<R: BufRead> ReplayClassifier<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            exhausted: false,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

impl<R: BufRead> Classifier for ReplayClassifier<R> {
    fn classify(&mut self) -> ClassifierResult<Option<ClassificationReading>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            self.exhausted = true;
            return Err(ClassifierError::Disconnected);
        }
        match line.trim() {
            "" | "-" => Ok(None),
            text => text.parse().map(Some),
        }
    }
}

impl Drop for LineClassifier {
    fn drop(&mut self) {
        if let Some(child) = self.child.as_mut() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Cursor;
    use std::time::{Duration, Instant};

    #[test]
    fn scripted_replays_then_goes_quiet() {
        let mut c = ScriptedClassifier::new();
        c.push_reading("grin", 0.9)
            .push_error(ClassifierError::NoReading)
            .push_none();

        assert_eq!(
            c.classify().unwrap(),
            Some(ClassificationReading::new("grin", 0.9))
        );
        assert_matches!(c.classify(), Err(ClassifierError::NoReading));
        assert_eq!(c.classify().unwrap(), None);
        assert_eq!(c.classify().unwrap(), None);
        assert_eq!(c.calls(), 4);
    }

    #[test]
    fn keyboard_maps_digits_to_catalog_order() {
        let catalog = ChallengeCatalog::default();
        let mut kb = KeyboardClassifier::new(&catalog);

        assert!(kb.press('2'));
        assert_eq!(
            kb.classify().unwrap(),
            Some(ClassificationReading::new("angry", 1.0))
        );
        // a press only counts for one tick
        assert_eq!(kb.classify().unwrap(), None);

        assert!(!kb.press('0'));
        assert!(!kb.press('9'));
        assert!(!kb.press('x'));
        assert_eq!(kb.classify().unwrap(), None);
    }

    #[test]
    fn keyboard_clear_drops_unpolled_press() {
        let mut kb = KeyboardClassifier::new(&ChallengeCatalog::default());
        assert!(kb.press('1'));
        kb.clear();
        assert_eq!(kb.classify().unwrap(), None);
    }

    fn drain_until_disconnected(c: &mut LineClassifier) -> Vec<ClassificationReading> {
        let deadline = Instant::now() + Duration::from_secs(2);
        let mut out = Vec::new();
        while Instant::now() < deadline {
            match c.classify() {
                Ok(Some(r)) => out.push(r),
                Ok(None) => std::thread::sleep(Duration::from_millis(5)),
                Err(_) => break,
            }
        }
        out
    }

    #[test]
    fn line_classifier_skips_malformed_lines() {
        let input = "grin 0.91\n\nnonsense\nkiss 0.5\n";
        let mut c = LineClassifier::from_reader(Cursor::new(input));
        let seen = drain_until_disconnected(&mut c);

        assert!(c.is_disconnected());
        assert!(!seen.is_empty());
        assert_eq!(seen.last(), Some(&ClassificationReading::new("kiss", 0.5)));
        assert!(seen.iter().all(|r| r.label != "nonsense"));
    }

    #[test]
    fn line_classifier_reports_disconnect_once_drained() {
        let mut c = LineClassifier::from_reader(Cursor::new(""));
        let _ = drain_until_disconnected(&mut c);
        assert_matches!(c.classify(), Err(ClassifierError::Disconnected));
    }

    #[test]
    fn replay_reads_one_line_per_tick() {
        let mut c = ReplayClassifier::new(Cursor::new("-\ngrin 0.9\n\nbogus\n"));

        assert_eq!(c.classify().unwrap(), None);
        assert_eq!(
            c.classify().unwrap(),
            Some(ClassificationReading::new("grin", 0.9))
        );
        assert_eq!(c.classify().unwrap(), None);
        assert_matches!(c.classify(), Err(ClassifierError::Malformed(_)));
        assert!(!c.is_exhausted());
        assert_matches!(c.classify(), Err(ClassifierError::Disconnected));
        assert!(c.is_exhausted());
    }

    #[test]
    fn empty_command_is_rejected() {
        assert_matches!(
            LineClassifier::spawn_command::<&str>("   ", &[]),
            Err(ClassifierError::Malformed(_))
        );
    }

    #[cfg(unix)]
    #[test]
    fn command_arguments_keep_their_spaces() {
        // a single argument holding a whole shell script
        let mut c = LineClassifier::spawn_command("sh", &["-c", "echo 'grin 0.9'"]).unwrap();
        let seen = drain_until_disconnected(&mut c);
        assert_eq!(seen, vec![ClassificationReading::new("grin", 0.9)]);
    }
}
