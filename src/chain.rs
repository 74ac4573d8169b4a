//! Runs `+`-separated command segments in order, threading the files each
//! step produced into the next one.

use crate::constants::CHAIN_SEPARATOR;
use crate::error::{ImgProError, Result};
use log::debug;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Files a step hands to the next step in the chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepOutput {
    pub files: Vec<PathBuf>,
}

impl StepOutput {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn single(path: impl Into<PathBuf>) -> Self {
        Self {
            files: vec![path.into()],
        }
    }
}

impl From<Vec<PathBuf>> for StepOutput {
    fn from(files: Vec<PathBuf>) -> Self {
        Self { files }
    }
}

/// One parsed chain segment.
pub trait ChainStep {
    fn name(&self) -> &'static str;

    /// The positional input given on the command line, if any.
    fn input(&self) -> Option<&Path>;

    /// Whether the step can run on files carried from the previous step.
    fn accepts_carried(&self) -> bool;

    fn run(&self, input: &Path) -> Result<StepOutput>;
}

/// Split arguments at standalone separator tokens, dropping empty segments.
pub fn split_chain<S: AsRef<OsStr> + Clone>(args: &[S]) -> Vec<Vec<S>> {
    args.split(|arg| arg.as_ref() == OsStr::new(CHAIN_SEPARATOR))
        .filter(|segment| !segment.is_empty())
        .map(<[S]>::to_vec)
        .collect()
}

/// Parse and run each segment in turn and return the files of the last step.
///
/// The first failing step ends the chain with its error. Files written by
/// earlier steps are left in place.
pub fn execute_chain<S, A, P>(args: &[A], mut parse: P) -> Result<Vec<PathBuf>>
where
    S: ChainStep,
    A: AsRef<OsStr> + Clone,
    P: FnMut(&[A]) -> Result<S>,
{
    let mut carried: Option<Vec<PathBuf>> = None;

    for segment in split_chain(args) {
        if let Some(files) = &carried {
            ensure_present(files)?;
        }

        let step = parse(segment.as_slice())?;
        let inputs = match (step.input(), carried.take()) {
            (Some(path), _) => vec![path.to_path_buf()],
            (None, Some(files)) if step.accepts_carried() => {
                if files.is_empty() {
                    debug!("Skipping {}: previous step produced no files", step.name());
                    carried = Some(files);
                    continue;
                }
                files
            }
            (None, _) => {
                return Err(ImgProError::InvalidArgument(format!(
                    "{} requires an input file",
                    step.name()
                )))
            }
        };

        let mut produced = Vec::new();
        for input in &inputs {
            produced.extend(step.run(input)?.files);
        }
        carried = Some(produced);
    }

    Ok(carried.unwrap_or_default())
}

/// Every carried file must still exist when the next step starts.
fn ensure_present(files: &[PathBuf]) -> Result<()> {
    match files.iter().find(|f| !f.exists()) {
        Some(missing) => Err(ImgProError::IntermediateFileDisappeared(missing.clone())),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::fs;
    use tempfile::TempDir;

    fn args(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_split_chain_segments() {
        assert_eq!(
            split_chain(&args(&["a", "+", "b", "+", "c"])),
            vec![args(&["a"]), args(&["b"]), args(&["c"])]
        );
        assert_eq!(
            split_chain(&args(&["resize", "photo.jpg", "--width", "300", "+", "convert", "--format", "webp"])),
            vec![
                args(&["resize", "photo.jpg", "--width", "300"]),
                args(&["convert", "--format", "webp"])
            ]
        );
    }

    #[test]
    fn test_split_chain_drops_empty_segments() {
        assert!(split_chain::<String>(&[]).is_empty());
        assert!(split_chain(&args(&["+"])).is_empty());
        assert_eq!(
            split_chain(&args(&["+", "a", "+", "+", "b", "+"])),
            vec![args(&["a"]), args(&["b"])]
        );
    }

    #[test]
    fn test_split_chain_ignores_embedded_plus() {
        assert_eq!(
            split_chain(&args(&["info", "a+b.jpg", "++", "+x"])),
            vec![args(&["info", "a+b.jpg", "++", "+x"])]
        );
    }

    /// Test double parsed from `name [file]`; writes `{dir}/{name}_{n}` per input.
    struct FakeStep<'a> {
        name: &'static str,
        input: Option<PathBuf>,
        dir: &'a Path,
        outputs: usize,
        fail: bool,
        log: &'a RefCell<Vec<String>>,
    }

    impl ChainStep for FakeStep<'_> {
        fn name(&self) -> &'static str {
            self.name
        }

        fn input(&self) -> Option<&Path> {
            self.input.as_deref()
        }

        fn accepts_carried(&self) -> bool {
            true
        }

        fn run(&self, input: &Path) -> Result<StepOutput> {
            self.log
                .borrow_mut()
                .push(format!("{} {}", self.name, input.file_name().unwrap().to_string_lossy()));
            if self.fail {
                return Err(ImgProError::UnsupportedFormat("boom".into()));
            }
            let files = (0..self.outputs)
                .map(|n| {
                    let path = self.dir.join(format!("{}_{}", self.name, n));
                    fs::write(&path, b"x").unwrap();
                    if self.name == "ghost" {
                        // deleted behind the executor's back
                        fs::remove_file(&path).unwrap();
                    }
                    path
                })
                .collect::<Vec<_>>();
            Ok(files.into())
        }
    }

    fn parser<'a>(
        dir: &'a Path,
        log: &'a RefCell<Vec<String>>,
    ) -> impl FnMut(&[String]) -> Result<FakeStep<'a>> {
        move |segment: &[String]| {
            let name = match segment[0].as_str() {
                "one" => "one",
                "two" => "two",
                "none" => "none",
                "fail" => "fail",
                "ghost" => "ghost",
                other => return Err(ImgProError::InvalidArgument(other.to_string())),
            };
            Ok(FakeStep {
                name,
                input: segment.get(1).map(PathBuf::from),
                dir,
                outputs: match name {
                    "two" => 2,
                    "none" => 0,
                    _ => 1,
                },
                fail: name == "fail",
                log,
            })
        }
    }

    #[test]
    fn test_carried_files_feed_next_step() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("source");
        fs::write(&source, b"x").unwrap();
        let log = RefCell::new(Vec::new());

        let chain = args(&["two", source.to_str().unwrap(), "+", "one"]);
        let result = execute_chain(&chain, parser(temp_dir.path(), &log)).unwrap();

        assert_eq!(
            *log.borrow(),
            vec!["two source", "one two_0", "one two_1"]
        );
        assert_eq!(result, vec![temp_dir.path().join("one_0"); 2]);
    }

    #[test]
    fn test_explicit_input_wins_over_carried() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("source");
        let other = temp_dir.path().join("other");
        fs::write(&source, b"x").unwrap();
        fs::write(&other, b"x").unwrap();
        let log = RefCell::new(Vec::new());

        let chain = args(&["two", source.to_str().unwrap(), "+", "one", other.to_str().unwrap()]);
        execute_chain(&chain, parser(temp_dir.path(), &log)).unwrap();
        assert_eq!(*log.borrow(), vec!["two source", "one other"]);
    }

    #[test]
    fn test_empty_carried_set_skips_following_steps() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("source");
        fs::write(&source, b"x").unwrap();
        let log = RefCell::new(Vec::new());

        let chain = args(&["none", source.to_str().unwrap(), "+", "one", "+", "two"]);
        let result = execute_chain(&chain, parser(temp_dir.path(), &log)).unwrap();
        assert!(result.is_empty());
        assert_eq!(*log.borrow(), vec!["none source"]);
    }

    #[test]
    fn test_first_step_without_input_is_invalid() {
        let temp_dir = TempDir::new().unwrap();
        let log = RefCell::new(Vec::new());

        let err = execute_chain(&args(&["one"]), parser(temp_dir.path(), &log)).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_first_failure_stops_chain() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("source");
        fs::write(&source, b"x").unwrap();
        let log = RefCell::new(Vec::new());

        let chain = args(&["one", source.to_str().unwrap(), "+", "fail", "+", "two"]);
        let err = execute_chain(&chain, parser(temp_dir.path(), &log)).unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert_eq!(*log.borrow(), vec!["one source", "fail one_0"]);
        // earlier output is not rolled back
        assert!(temp_dir.path().join("one_0").exists());
    }

    #[test]
    fn test_parse_error_in_later_segment_stops_chain() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("source");
        fs::write(&source, b"x").unwrap();
        let log = RefCell::new(Vec::new());

        let chain = args(&["one", source.to_str().unwrap(), "+", "bogus"]);
        let err = execute_chain(&chain, parser(temp_dir.path(), &log)).unwrap_err();
        assert!(matches!(err, ImgProError::InvalidArgument(_)));
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn test_vanished_intermediate_aborts_chain() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("source");
        fs::write(&source, b"x").unwrap();
        let log = RefCell::new(Vec::new());

        let chain = args(&["ghost", source.to_str().unwrap(), "+", "one"]);
        let err = execute_chain(&chain, parser(temp_dir.path(), &log)).unwrap_err();

        let vanished = temp_dir.path().join("ghost_0");
        assert!(matches!(err, ImgProError::IntermediateFileDisappeared(ref p) if *p == vanished));
        assert_eq!(err.exit_code(), 4);
        assert_eq!(*log.borrow(), vec!["ghost source"]);
    }

    #[test]
    fn test_ensure_present_names_missing_path() {
        let temp_dir = TempDir::new().unwrap();
        let present = temp_dir.path().join("present.jpg");
        fs::write(&present, b"x").unwrap();
        let missing = temp_dir.path().join("out_300.jpg");

        assert!(ensure_present(&[present.clone()]).is_ok());
        let err = ensure_present(&[present, missing.clone()]).unwrap_err();
        assert!(matches!(err, ImgProError::IntermediateFileDisappeared(ref p) if *p == missing));
        assert_eq!(err.exit_code(), 4);
        assert!(err.to_string().contains("out_300.jpg"));
    }
}
