use std::fmt;
use std::str::FromStr;

pub const USAGE: &str =
    "usage: tipcast <ingest <file> | aggregate | train | predict | all [file]>";

#[derive(Debug, Clone)]
pub enum Stage {
    Ingest { path: String },
    Aggregate,
    Train,
    Predict,
    All { ingest_path: Option<String> },
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split_whitespace().collect();
        match parts.first() {
            Some(&"ingest") => match parts.get(1) {
                Some(path) => Ok(Stage::Ingest {
                    path: path.to_string(),
                }),
                None => Err(format!("ingest requires a file argument\n{}", USAGE)),
            },
            Some(&"aggregate") => Ok(Stage::Aggregate),
            Some(&"train") => Ok(Stage::Train),
            Some(&"predict") => Ok(Stage::Predict),
            Some(&"all") => Ok(Stage::All {
                ingest_path: parts.get(1).map(|p| p.to_string()),
            }),
            Some(other) => Err(format!("unknown stage: {}\n{}", other, USAGE)),
            None => Err(USAGE.to_string()),
        }
    }
}

/// 每个阶段结束时上报的行数统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageSummary {
    pub processed: u64,
    pub skipped: u64,
    pub failed: u64,
}

impl fmt::Display for StageSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} processed, {} skipped, {} failed",
            self.processed, self.skipped, self.failed
        )
    }
}
