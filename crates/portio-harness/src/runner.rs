//! Test execution engine.

use std::collections::VecDeque;
use std::io::{self, Cursor};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use portio_core::{
    BufferMode, Device, Direction, Port, PortConfig, PortError, SeekableDevice, Whence,
};

use crate::diff::render_diff;
use crate::error::HarnessError;
use crate::fixtures::{FixtureCase, FixtureSet, Op, PortSetup};
use crate::structured_log::{LogEmitter, LogEntry, Outcome};

/// Result of verifying a single fixture case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    pub case_name: String,
    pub family: String,
    pub passed: bool,
    pub expected: Vec<String>,
    pub actual: Vec<String>,
    /// Diff if the case failed.
    pub diff: Option<String>,
}

/// Aggregate verification summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub results: Vec<VerificationResult>,
}

impl VerificationSummary {
    /// Build a summary from a list of results.
    #[must_use]
    pub fn from_results(results: Vec<VerificationResult>) -> Self {
        let total = results.len();
        let passed = results.iter().filter(|r| r.passed).count();
        Self {
            total,
            passed,
            failed: total - passed,
            results,
        }
    }

    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// Runs fixture sets and collects verification results.
pub struct TestRunner {
    /// Name of the test campaign.
    pub campaign: String,
}

impl TestRunner {
    #[must_use]
    pub fn new(campaign: impl Into<String>) -> Self {
        Self {
            campaign: campaign.into(),
        }
    }

    /// Run all cases in a set. A case whose setup is malformed fails with
    /// the setup error as its only actual result.
    pub fn run(&self, fixture_set: &FixtureSet) -> Vec<VerificationResult> {
        fixture_set
            .cases
            .iter()
            .map(|case| verify_case(&fixture_set.family, case))
            .collect()
    }

    /// Like [`TestRunner::run`], emitting one JSONL entry per case.
    pub fn run_logged(
        &self,
        fixture_set: &FixtureSet,
        emitter: &mut LogEmitter,
    ) -> io::Result<Vec<VerificationResult>> {
        let mut results = Vec::with_capacity(fixture_set.cases.len());
        for case in &fixture_set.cases {
            let started = Instant::now();
            let result = verify_case(&fixture_set.family, case);
            let latency_ns = u64::try_from(started.elapsed().as_nanos()).unwrap_or(u64::MAX);
            let outcome = if result.passed {
                Outcome::Pass
            } else {
                Outcome::Fail
            };
            let mut entry =
                LogEntry::case_result(&self.campaign, &fixture_set.family, &case.name, outcome)
                    .with_latency_ns(latency_ns);
            if let Some(diff) = &result.diff {
                entry = entry.with_diff(diff.as_str());
            }
            emitter.emit_entry(entry)?;
            results.push(result);
        }
        Ok(results)
    }
}

fn verify_case(family: &str, case: &FixtureCase) -> VerificationResult {
    let actual = match execute_case(case) {
        Ok(actual) => actual,
        Err(err) => vec![format!("setup-error:{err}")],
    };
    let passed = actual == case.expected;
    VerificationResult {
        case_name: case.name.clone(),
        family: family.to_string(),
        passed,
        diff: (!passed).then(|| render_diff(&case.expected, &actual)),
        expected: case.expected.clone(),
        actual,
    }
}

// ---------------------------------------------------------------------------
// Devices
// ---------------------------------------------------------------------------

/// Input device yielding one scripted chunk per read.
struct ChunkDevice(VecDeque<Vec<u8>>);

impl Device for ChunkDevice {
    fn read(&mut self, buf: &mut [u8], _non_blocking: bool) -> io::Result<usize> {
        let Some(mut chunk) = self.0.pop_front() else {
            return Ok(0);
        };
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            self.0.push_front(chunk.split_off(n));
        }
        Ok(n)
    }

    fn write(&mut self, _data: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "input device"))
    }
}

/// Output device appending every write to a shared log.
struct RecordDevice(Arc<Mutex<Vec<u8>>>);

impl Device for RecordDevice {
    fn read(&mut self, _buf: &mut [u8], _non_blocking: bool) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "output device"))
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(data);
        Ok(data.len())
    }
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

struct Harnessed {
    port: Port,
    recorded: Option<Arc<Mutex<Vec<u8>>>>,
}

fn invalid(case: &FixtureCase, message: String) -> HarnessError {
    HarnessError::InvalidCase {
        case: case.name.clone(),
        message,
    }
}

fn config_for(
    case: &FixtureCase,
    mode: Option<&str>,
    buffer_size: Option<usize>,
) -> Result<PortConfig, HarnessError> {
    let mode = match mode {
        None => BufferMode::Full,
        Some(m) => BufferMode::from_str_loose(m)
            .ok_or_else(|| invalid(case, format!("unknown buffer mode '{m}'")))?,
    };
    Ok(PortConfig::new(
        buffer_size.unwrap_or(portio_core::BUFSIZ),
        mode,
    ))
}

fn build_port(case: &FixtureCase) -> Result<Harnessed, HarnessError> {
    let label = case.name.as_str();
    let built = match &case.port {
        PortSetup::InputString { text } => Harnessed {
            port: Port::input_string(label, text),
            recorded: None,
        },
        PortSetup::InputBytes { bytes } => Harnessed {
            port: Port::input_bytes(label, bytes.clone()),
            recorded: None,
        },
        PortSetup::Output => Harnessed {
            port: Port::output_bytes(label),
            recorded: None,
        },
        PortSetup::ChunkedInput {
            chunks,
            mode,
            buffer_size,
        } => {
            let config = config_for(case, mode.as_deref(), *buffer_size)?;
            let device = ChunkDevice(chunks.iter().cloned().collect());
            Harnessed {
                port: Port::buffered(label, device, Direction::Input, &config)
                    .map_err(|e| invalid(case, e.to_string()))?,
                recorded: None,
            }
        }
        PortSetup::SeekableInput { text, buffer_size } => {
            let config = config_for(case, None, *buffer_size)?;
            let device = SeekableDevice(Cursor::new(text.clone().into_bytes()));
            Harnessed {
                port: Port::buffered(label, device, Direction::Input, &config)
                    .map_err(|e| invalid(case, e.to_string()))?,
                recorded: None,
            }
        }
        PortSetup::BufferedOutput { mode, buffer_size } => {
            let config = config_for(case, mode.as_deref(), *buffer_size)?;
            let log = Arc::new(Mutex::new(Vec::new()));
            let device = RecordDevice(Arc::clone(&log));
            Harnessed {
                port: Port::buffered(label, device, Direction::Output, &config)
                    .map_err(|e| invalid(case, e.to_string()))?,
                recorded: Some(log),
            }
        }
    };
    Ok(built)
}

fn parse_whence(case: &FixtureCase, whence: &str) -> Result<Whence, HarnessError> {
    match whence.to_ascii_lowercase().as_str() {
        "start" | "set" => Ok(Whence::Start),
        "current" | "cur" => Ok(Whence::Current),
        "end" => Ok(Whence::End),
        other => Err(invalid(case, format!("unknown whence '{other}'"))),
    }
}

/// Replay a case and render each operation's result.
pub fn execute_case(case: &FixtureCase) -> Result<Vec<String>, HarnessError> {
    let harnessed = build_port(case)?;
    let port = &harnessed.port;
    let mut rendered = Vec::with_capacity(case.ops.len());
    for op in &case.ops {
        let line = match op {
            Op::GetByte => render(port.get_byte(), byte_or_eof),
            Op::GetChar => render(port.get_char(), char_or_eof),
            Op::PeekByte => render(port.peek_byte(), byte_or_eof),
            Op::PeekChar => render(port.peek_char(), char_or_eof),
            Op::GetBlock { len } => {
                let mut buf = vec![0u8; *len];
                render(port.get_block(&mut buf), |n| match n {
                    Some(n) => format!("block:{}", String::from_utf8_lossy(&buf[..n])),
                    None => "eof".to_string(),
                })
            }
            Op::ReadLine => render(port.read_line(), |line| match line {
                Some(line) => format!("line:{line}"),
                None => "eof".to_string(),
            }),
            Op::UngetByte { byte } => render(port.unget_byte(*byte), ok),
            Op::UngetChar { c } => render(port.unget_char(*c), ok),
            Op::PutByte { byte } => render(port.put_byte(*byte), ok),
            Op::PutChar { c } => render(port.put_char(*c), ok),
            Op::PutStr { s } => render(port.put_str(s), ok),
            Op::Flush => render(port.flush(), ok),
            Op::Close => render(port.close(), ok),
            Op::IsReady => render(port.is_ready(), |r| r.to_string()),
            Op::Seek { offset, whence } => {
                let whence = parse_whence(case, whence)?;
                render(port.seek(*offset, whence), position)
            }
            Op::Tell => render(port.tell(), position),
            Op::Written => match &harnessed.recorded {
                Some(log) => format!("written:{}", String::from_utf8_lossy(&log.lock())),
                None => render(port.output_string(), |s| format!("written:{s}")),
            },
        };
        rendered.push(line);
    }
    Ok(rendered)
}

fn render<T>(result: portio_core::Result<T>, show: impl FnOnce(T) -> String) -> String {
    match result {
        Ok(v) => show(v),
        Err(err) => render_error(&err),
    }
}

fn ok(_: ()) -> String {
    "ok".to_string()
}

fn byte_or_eof(b: Option<u8>) -> String {
    b.map_or_else(|| "eof".to_string(), |b| format!("byte:{b}"))
}

fn char_or_eof(c: Option<char>) -> String {
    c.map_or_else(|| "eof".to_string(), |c| format!("char:{c}"))
}

fn position(pos: Option<u64>) -> String {
    pos.map_or_else(|| "none".to_string(), |p| format!("pos:{p}"))
}

fn render_error(err: &PortError) -> String {
    let kind = match err {
        PortError::Closed { .. } => "closed",
        PortError::Unsupported { .. } => "unsupported",
        PortError::TruncatedEncoding { .. } => "truncated",
        PortError::PushbackOverflow { .. } => "overflow",
        PortError::EmptyRequest { .. } => "empty_request",
        PortError::Reentered { .. } => "reentered",
        PortError::Io { .. } => "io",
    };
    format!("error:{kind}")
}
