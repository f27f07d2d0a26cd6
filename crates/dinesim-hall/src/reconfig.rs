//! Runtime reconfiguration of counter capacities.
//!
//! Directives are text lines of the form `<counter_name> <new_server_count>` read from [`DirectiveSource`]s,
//! which are polled by a listener process with a fixed period. Invalid directives are logged and ignored.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::str::FromStr;

use log::warn;

use dinesim_core::{log_info, log_warn, ProcessContext, SimResult};

use crate::error::DirectiveError;
use crate::facility::FacilityState;

/// Request to change the number of servers of a counter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Directive {
    pub counter: String,
    pub server_count: u32,
}

impl FromStr for Directive {
    type Err = DirectiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = s.split_whitespace().collect();
        let [counter, count] = tokens.as_slice() else {
            return Err(DirectiveError::Malformed(s.trim().to_string()));
        };
        let count: i64 = count
            .parse()
            .map_err(|_| DirectiveError::Malformed(s.trim().to_string()))?;
        if count <= 0 || count > u32::MAX as i64 {
            return Err(DirectiveError::NonPositiveCount {
                counter: counter.to_string(),
                count,
            });
        }
        Ok(Self {
            counter: counter.to_string(),
            server_count: count as u32,
        })
    }
}

/// External channel of directive lines.
pub trait DirectiveSource {
    /// Returns the next pending line, if any.
    fn poll(&mut self) -> Option<String>;
}

/// In-memory directive queue. Clones share the same queue, so one clone can be handed to the simulation
/// while another one is used to push directives.
#[derive(Clone, Default)]
pub struct QueueDirectiveSource {
    lines: Rc<RefCell<VecDeque<String>>>,
}

impl QueueDirectiveSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<S: Into<String>>(&self, line: S) {
        self.lines.borrow_mut().push_back(line.into());
    }

    pub fn len(&self) -> usize {
        self.lines.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.borrow().is_empty()
    }
}

impl DirectiveSource for QueueDirectiveSource {
    fn poll(&mut self) -> Option<String> {
        self.lines.borrow_mut().pop_front()
    }
}

/// Reads directives written to a file by an external tool.
///
/// On each poll with no buffered lines the file is renamed to a sibling `.taken` path, read and removed,
/// so every written line is consumed once. Lines written after the rename go to a new file and are read
/// on a later poll. A missing file means no directives.
pub struct FileDirectiveSource {
    path: PathBuf,
    taken: PathBuf,
    buffered: VecDeque<String>,
}

impl FileDirectiveSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let mut taken = path.clone().into_os_string();
        taken.push(".taken");
        Self {
            path,
            taken: PathBuf::from(taken),
            buffered: VecDeque::new(),
        }
    }

    fn refill(&mut self) {
        if let Err(e) = fs::rename(&self.path, &self.taken) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!("failed to take directive file {}: {}", self.path.display(), e);
            }
            return;
        }
        let content = fs::read_to_string(&self.taken);
        if let Err(e) = fs::remove_file(&self.taken) {
            warn!("failed to remove {}: {}", self.taken.display(), e);
        }
        match content {
            Ok(content) => self.buffered.extend(
                content
                    .lines()
                    .map(|l| l.trim())
                    .filter(|l| !l.is_empty())
                    .map(|l| l.to_string()),
            ),
            Err(e) => warn!("failed to read directive file {}: {}", self.path.display(), e),
        }
    }
}

impl DirectiveSource for FileDirectiveSource {
    fn poll(&mut self) -> Option<String> {
        if self.buffered.is_empty() {
            self.refill();
        }
        self.buffered.pop_front()
    }
}

/// Directive sources shared between the hall simulation and the listener process.
pub type DirectiveSources = Rc<RefCell<Vec<Box<dyn DirectiveSource>>>>;

fn poll_all(sources: &DirectiveSources) -> Vec<String> {
    let mut lines = Vec::new();
    for source in sources.borrow_mut().iter_mut() {
        while let Some(line) = source.poll() {
            lines.push(line);
        }
    }
    lines
}

/// Parses and applies a single directive line.
pub fn handle_directive(line: &str, facility: &mut FacilityState) -> Result<Directive, DirectiveError> {
    let directive = match line.parse::<Directive>() {
        Ok(directive) => directive,
        Err(e) => {
            facility.reject_directive();
            return Err(e);
        }
    };
    facility.apply_directive(&directive)?;
    Ok(directive)
}

/// Body of the listener process: polls the sources every `period` until `end_time`.
pub async fn listen_directives(
    ctx: ProcessContext,
    facility: Rc<RefCell<FacilityState>>,
    sources: DirectiveSources,
    period: f64,
    end_time: f64,
) -> SimResult<()> {
    loop {
        for line in poll_all(&sources) {
            if line.trim().is_empty() {
                continue;
            }
            let result = handle_directive(&line, &mut facility.borrow_mut());
            match result {
                Ok(directive) => log_info!(
                    ctx,
                    "counter {} now has {} servers",
                    directive.counter,
                    directive.server_count
                ),
                Err(e) => log_warn!(ctx, "ignored directive: {}", e),
            }
        }
        if ctx.time() + period > end_time {
            return Ok(());
        }
        ctx.hold(period).await?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_directive() {
        assert_eq!(
            "noodles 3".parse::<Directive>(),
            Ok(Directive {
                counter: "noodles".to_string(),
                server_count: 3
            })
        );
        assert_eq!(
            "  noodles\t2 ".parse::<Directive>(),
            Ok(Directive {
                counter: "noodles".to_string(),
                server_count: 2
            })
        );
    }

    #[test]
    fn test_parse_invalid_directive() {
        assert_eq!(
            "noodles".parse::<Directive>(),
            Err(DirectiveError::Malformed("noodles".to_string()))
        );
        assert_eq!(
            "noodles three".parse::<Directive>(),
            Err(DirectiveError::Malformed("noodles three".to_string()))
        );
        assert_eq!(
            "noodles 3 now".parse::<Directive>(),
            Err(DirectiveError::Malformed("noodles 3 now".to_string()))
        );
        assert_eq!(
            "noodles 0".parse::<Directive>(),
            Err(DirectiveError::NonPositiveCount {
                counter: "noodles".to_string(),
                count: 0
            })
        );
        assert!(matches!(
            "noodles -4".parse::<Directive>(),
            Err(DirectiveError::NonPositiveCount { count: -4, .. })
        ));
    }

    #[test]
    fn test_queue_source() {
        let handle = QueueDirectiveSource::new();
        let mut source = handle.clone();
        handle.push("a 1");
        handle.push("b 2");
        assert_eq!(handle.len(), 2);
        assert_eq!(source.poll(), Some("a 1".to_string()));
        assert_eq!(source.poll(), Some("b 2".to_string()));
        assert_eq!(source.poll(), None);
        assert!(handle.is_empty());
    }

    #[test]
    fn test_file_source() {
        let path = std::env::temp_dir().join(format!("dinesim-directives-{}.txt", std::process::id()));
        let mut source = FileDirectiveSource::new(&path);
        assert_eq!(source.poll(), None);

        fs::write(&path, "snack 4\n\nnoodles 2\n").unwrap();
        assert_eq!(source.poll(), Some("snack 4".to_string()));
        assert!(!path.exists());

        // written while the previous batch is still buffered
        fs::write(&path, "soup 1\n").unwrap();
        assert_eq!(source.poll(), Some("noodles 2".to_string()));
        assert_eq!(source.poll(), Some("soup 1".to_string()));
        assert_eq!(source.poll(), None);
        assert!(!path.exists());
    }
}
