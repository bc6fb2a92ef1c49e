//! Repository investigator: forensic checks over a sandboxed checkout.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use tempfile::TempDir;
use tracing::{debug, instrument, warn};

use crate::domain::{Evidence, Presence, RubricDimension, TargetArtifact};
use crate::execution::{CollaboratorError, CollaboratorResult};
use crate::orchestration::Subject;

use super::{dimension_keywords, git, InvestigationSession, Investigator};

/// Clones (or opens) the repository and runs the source-level checks.
#[derive(Debug, Clone, Copy, Default)]
pub struct RepoInvestigator;

#[async_trait]
impl Investigator for RepoInvestigator {
    fn name(&self) -> &str {
        "repo_investigator"
    }

    fn artifact(&self) -> TargetArtifact {
        TargetArtifact::GithubRepo
    }

    #[instrument(skip(self), fields(repo = %subject.repo))]
    async fn open(&self, subject: &Subject) -> CollaboratorResult<Box<dyn InvestigationSession>> {
        if let Some(local) = subject.local_repo() {
            debug!("auditing local checkout in place");
            return Ok(Box::new(RepoSession {
                root: local.to_path_buf(),
                _sandbox: None,
            }));
        }

        let sandbox = tempfile::Builder::new().prefix("auditor_repo_").tempdir()?;
        git::clone_into(&subject.repo, sandbox.path()).await?;
        debug!(path = %sandbox.path().display(), "repository cloned into sandbox");
        Ok(Box::new(RepoSession {
            root: sandbox.path().to_path_buf(),
            _sandbox: Some(sandbox),
        }))
    }
}

/// A checkout under examination. A cloned sandbox is removed on drop.
pub struct RepoSession {
    root: PathBuf,
    _sandbox: Option<TempDir>,
}

impl RepoSession {
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl InvestigationSession for RepoSession {
    async fn examine(&self, dimension: &RubricDimension) -> CollaboratorResult<Vec<Evidence>> {
        if dimension.id == "git_forensic_analysis" {
            return Ok(vec![git_narrative(&self.root).await]);
        }

        // Remaining checks walk the checkout with blocking std::fs calls.
        let root = self.root.clone();
        let dimension = dimension.clone();
        let evidence = tokio::task::spawn_blocking(move || match dimension.id.as_str() {
            "state_management_rigor" => state_structure(&root),
            "graph_orchestration" => graph_wiring(&root),
            "safe_tool_engineering" => tool_safety(&root),
            _ => inventory(&root, &dimension),
        })
        .await
        .map_err(|e| CollaboratorError::Unavailable(format!("repository scan task failed: {e}")))?;
        Ok(vec![evidence])
    }
}

/// Commit history read as a development narrative.
pub async fn git_narrative(root: &Path) -> Evidence {
    const GOAL: &str = "Analyze git history narrative for iterative progression";

    let log = match git::log_oneline(root).await {
        Ok(log) => log,
        Err(e) => {
            return Evidence::new(
                GOAL,
                Presence::Absent,
                "git log",
                format!("Error extracting git log: {e}"),
                0.5,
            );
        }
    };

    let commits = log.len();
    let lower: Vec<String> = log.iter().map(|l| l.to_lowercase()).collect();
    let any_of = |terms: &[&str]| lower.iter().any(|l| terms.iter().any(|t| l.contains(t)));

    let progression =
        any_of(&["setup", "env"]) && any_of(&["tool", "ast"]) && any_of(&["graph", "wire", "node"]);
    let monolithic = commits <= 1
        || (commits < 3 && lower.first().is_some_and(|first| first.contains("init")));

    let mut rationale = format!("Detected {commits} commits.");
    if monolithic {
        rationale.push_str(" Appears to be a monolithic or bulk upload pattern.");
    } else if progression {
        rationale.push_str(" History shows clear progression: Environment -> Tooling -> Graph.");
    } else {
        rationale.push_str(" History appears iterative but progression keywords are not found in all phases.");
    }

    Evidence::new(
        GOAL,
        Presence::from_bool(commits > 3 && !monolithic),
        "git log",
        rationale,
        0.9,
    )
    .with_content(log.join("\n"))
}

/// Typed state definitions holding evidence and opinion collections.
pub fn state_structure(root: &Path) -> Evidence {
    const GOAL: &str = "Verify existence of typed state and rigor";

    let Some((location, content)) = ["src/state.py", "src/graph.py"]
        .iter()
        .find_map(|rel| read_text(&root.join(rel)).map(|c| (*rel, c)))
    else {
        return Evidence::new(
            GOAL,
            Presence::Absent,
            "src/state.py",
            "Neither src/state.py nor src/graph.py found.",
            1.0,
        );
    };

    let pydantic = content.contains("BaseModel");
    let typed_dict = content.contains("TypedDict");
    let evidence = content.contains("Evidence");
    let opinion = content.contains("JudicialOpinion");
    let reducers = content.contains("operator.add") || content.contains("operator.ior");

    let mut rationale =
        format!("Found state definitions. Pydantic: {pydantic}, TypedDict: {typed_dict}, reducers: {reducers}.");
    if evidence && opinion {
        rationale.push_str(" State maintains collections of Evidence and JudicialOpinion.");
    } else {
        rationale.push_str(" Missing Evidence or JudicialOpinion collections in state.");
    }

    Evidence::new(
        GOAL,
        Presence::from_bool((pydantic || typed_dict) && evidence && opinion),
        location,
        rationale,
        1.0,
    )
    .with_content(content)
}

const EDGE_PATTERN: &str = r#"\.add_edge\(\s*(?:["']([^"']+)["']|([A-Za-z_][A-Za-z0-9_]*))\s*,\s*(?:["']([^"']+)["']|([A-Za-z_][A-Za-z0-9_]*))"#;

fn edge_pattern() -> Option<&'static Regex> {
    static EDGE: OnceLock<Option<Regex>> = OnceLock::new();
    EDGE.get_or_init(|| match Regex::new(EDGE_PATTERN) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!(error = %e, "edge pattern failed to compile; graph wiring check disabled");
            None
        }
    })
    .as_ref()
}

/// Edges declared in `src/graph.py`, in source order.
pub fn parse_edges(source: &str) -> Vec<(String, String)> {
    let Some(pattern) = edge_pattern() else {
        return Vec::new();
    };
    pattern
        .captures_iter(source)
        .filter_map(|cap| {
            let from = cap.get(1).or_else(|| cap.get(2))?.as_str();
            let to = cap.get(3).or_else(|| cap.get(4))?.as_str();
            Some((from.to_string(), to.to_string()))
        })
        .collect()
}

/// Graph wiring with fan-out and fan-in detection.
pub fn graph_wiring(root: &Path) -> Evidence {
    const GOAL: &str = "Verify parallel fan-out/fan-in graph wiring";

    let Some(source) = read_text(&root.join("src/graph.py")) else {
        return Evidence::new(GOAL, Presence::Absent, "src/graph.py", "src/graph.py not found.", 1.0);
    };

    let edges = parse_edges(&source);
    let mut out_degree: BTreeMap<&str, usize> = BTreeMap::new();
    let mut in_degree: BTreeMap<&str, usize> = BTreeMap::new();
    for (from, to) in &edges {
        *out_degree.entry(from.as_str()).or_default() += 1;
        *in_degree.entry(to.as_str()).or_default() += 1;
    }
    let fan_out: Vec<&str> = out_degree.iter().filter(|(_, n)| **n > 1).map(|(k, _)| *k).collect();
    let fan_in: Vec<&str> = in_degree.iter().filter(|(_, n)| **n > 1).map(|(k, _)| *k).collect();

    let mut rationale = format!("Detected {} edge(s).", edges.len());
    if fan_out.is_empty() {
        rationale.push_str(" No parallel fan-out detected (purely linear flow).");
    } else {
        rationale.push_str(&format!(" Fan-out from: {}.", fan_out.join(", ")));
    }
    if !fan_in.is_empty() {
        rationale.push_str(&format!(" Fan-in at: {}.", fan_in.join(", ")));
    }

    let listing = edges
        .iter()
        .map(|(from, to)| format!("{from} -> {to}"))
        .collect::<Vec<_>>()
        .join("\n");

    Evidence::new(
        GOAL,
        Presence::from_bool(!fan_out.is_empty() && !fan_in.is_empty()),
        "src/graph.py",
        rationale,
        0.8,
    )
    .with_content(listing)
}

/// Sandboxed tooling: temp directories instead of raw shell calls.
pub fn tool_safety(root: &Path) -> Evidence {
    const GOAL: &str = "Safe tool engineering";

    let tools = root.join("src/tools");
    let Ok(entries) = fs::read_dir(&tools) else {
        return Evidence::new(GOAL, Presence::Absent, "src/tools/", "src/tools/ not found.", 1.0);
    };

    let mut sources: Vec<(String, String)> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "py"))
        .filter_map(|p| {
            let name = p.file_name()?.to_string_lossy().into_owned();
            read_text(&p).map(|c| (name, c))
        })
        .collect();
    sources.sort();

    let uses_tempfile = sources
        .iter()
        .any(|(_, c)| c.contains("tempfile.TemporaryDirectory") || c.contains("TemporaryDirectory("));
    let shell_calls: Vec<&str> = sources
        .iter()
        .filter(|(_, c)| c.contains("os.system("))
        .map(|(n, _)| n.as_str())
        .collect();

    let mut rationale = format!(
        "Scanned {} tool module(s). Tempfile: {uses_tempfile}, os.system: {}.",
        sources.len(),
        !shell_calls.is_empty()
    );
    if !shell_calls.is_empty() {
        rationale.push_str(&format!(
            " Raw os.system( calls allow shell injection in: {}.",
            shell_calls.join(", ")
        ));
    }

    Evidence::new(
        GOAL,
        Presence::from_bool(uses_tempfile && shell_calls.is_empty()),
        "src/tools/",
        rationale,
        1.0,
    )
}

/// Fallback check: files whose path mentions the dimension's keywords.
pub fn inventory(root: &Path, dimension: &RubricDimension) -> Evidence {
    let goal = format!("Locate source related to {}", dimension.display_name());
    let keywords = dimension_keywords(dimension);

    let mut files = Vec::new();
    collect_files(root, root, &mut files, 0);
    files.sort();

    let matches: Vec<&String> = files
        .iter()
        .filter(|f| {
            let lower = f.to_lowercase();
            keywords.iter().any(|k| lower.contains(k.as_str()))
        })
        .collect();

    let rationale = format!(
        "Inventoried {} file(s); {} match keywords [{}].",
        files.len(),
        matches.len(),
        keywords.join(", ")
    );
    let found = if matches.is_empty() {
        Presence::Unknown
    } else {
        Presence::Present
    };
    let listing = matches
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    Evidence::new(goal, found, ".", rationale, 0.4).with_content(listing)
}

const MAX_INVENTORY_DEPTH: usize = 6;

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<String>, depth: usize) {
    if depth > MAX_INVENTORY_DEPTH {
        return;
    }
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.filter_map(Result::ok) {
        let path = entry.path();
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if hidden {
            continue;
        }
        if path.is_dir() {
            collect_files(root, &path, out, depth + 1);
        } else if let Ok(rel) = path.strip_prefix(root) {
            out.push(rel.to_string_lossy().into_owned());
        }
    }
}

fn read_text(path: &Path) -> Option<String> {
    fs::read_to_string(path).ok()
}
