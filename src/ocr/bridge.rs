use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use image::{ImageFormat, RgbImage};
use serde_json::Value;
use tempfile::TempDir;

use crate::error::{Error, Result};
use crate::ocr::config::{BridgeCommand, EngineConfig};
use crate::ocr::result::EngineOutput;
use crate::ocr::OcrEngine;

/// OCR engine hosted in a helper process.
///
/// The helper is started once and kept alive for the whole run. For every page
/// a PNG is written to a scratch directory and its path is sent as one JSON
/// line, `{"image": "<path>"}`. The helper answers with one JSON line: the list
/// of result objects for that image, or `{"error": "<message>"}`.
pub struct BridgeEngine {
    program: String,
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
    scratch: TempDir,
}

impl BridgeEngine {
    pub fn spawn(command: &BridgeCommand, config: &EngineConfig) -> Result<Self> {
        let program = command.program.display().to_string();
        let env = config.child_env(|key| std::env::var_os(key));

        let mut child = Command::new(&command.program)
            .arg(&command.script)
            .args(config.bridge_args())
            .envs(env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| Error::BridgeSpawn {
                program: program.clone(),
                source,
            })?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take().ok_or(Error::BridgeExited)?;
        let scratch = tempfile::Builder::new().prefix("pageocr-").tempdir()?;

        tracing::info!(
            program = %program,
            script = %command.script.display(),
            lang = %config.lang,
            "OCR bridge started"
        );

        Ok(Self {
            program,
            child,
            stdin,
            stdout: BufReader::new(stdout),
            scratch,
        })
    }

    fn request(&mut self, image_path: &Path) -> Result<Value> {
        let stdin = self.stdin.as_mut().ok_or(Error::BridgeExited)?;
        let request = serde_json::json!({ "image": image_path.to_string_lossy() });
        writeln!(stdin, "{request}")
            .and_then(|_| stdin.flush())
            .map_err(|err| match err.kind() {
                ErrorKind::BrokenPipe => Error::BridgeExited,
                _ => Error::Io(err),
            })?;

        let mut line = String::new();
        if self.stdout.read_line(&mut line)? == 0 {
            return Err(Error::BridgeExited);
        }

        let answer: Value = serde_json::from_str(line.trim())
            .map_err(|err| Error::BridgeProtocol(format!("{err}: {}", line.trim())))?;
        if let Some(message) = error_message(&answer) {
            return Err(Error::Engine(message));
        }
        Ok(answer)
    }
}

fn error_message(answer: &Value) -> Option<String> {
    let map = answer.as_object()?;
    if map.len() != 1 {
        return None;
    }
    match map.get("error")? {
        Value::String(message) => Some(message.clone()),
        other => Some(other.to_string()),
    }
}

impl OcrEngine for BridgeEngine {
    fn predict(&mut self, image: &RgbImage) -> Result<Vec<EngineOutput>> {
        let page = tempfile::Builder::new()
            .prefix("page-")
            .suffix(".png")
            .tempfile_in(self.scratch.path())?;
        image.save_with_format(page.path(), ImageFormat::Png)?;

        let answer = self.request(page.path())?;
        Ok(EngineOutput::from_answer(answer))
    }
}

impl Drop for BridgeEngine {
    fn drop(&mut self) {
        // Closing stdin is the helper's signal to exit.
        drop(self.stdin.take());
        match self.child.wait() {
            Ok(status) if !status.success() => {
                tracing::warn!(program = %self.program, %status, "OCR bridge exited with failure");
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(program = %self.program, error = %err, "failed to wait for OCR bridge");
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    use crate::ocr::result::StructuredResult;
    use pretty_assertions::assert_eq;

    /// Writes a shell script standing in for the helper and returns a command
    /// that runs it with `sh`.
    fn fake_helper(dir: &TempDir, body: &str) -> BridgeCommand {
        let script = dir.path().join("helper.sh");
        fs::write(&script, body).unwrap();
        BridgeCommand {
            program: PathBuf::from("sh"),
            script,
        }
    }

    fn page() -> RgbImage {
        RgbImage::new(4, 3)
    }

    #[test]
    fn answers_are_classified_per_page() {
        let dir = TempDir::new().unwrap();
        let command = fake_helper(
            &dir,
            r#"while read -r line; do
  echo '[{"dt_polys":[[[0,0],[10,0],[10,5],[0,5]]],"rec_texts":["Hi"],"rec_scores":[0.99]}]'
done
"#,
        );
        let mut engine = BridgeEngine::spawn(&command, &EngineConfig::default()).unwrap();

        for _ in 0..2 {
            let outputs = engine.predict(&page()).unwrap();
            assert_eq!(outputs.len(), 1);
            let EngineOutput::Structured(result) = &outputs[0] else {
                panic!("expected structured output");
            };
            assert_eq!(result.texts(), [Some("Hi".to_string())]);
        }
    }

    #[test]
    fn helper_receives_an_existing_png() {
        let dir = TempDir::new().unwrap();
        let command = fake_helper(
            &dir,
            r#"while read -r line; do
  path=$(printf '%s' "$line" | sed 's/.*"image":"\([^"]*\)".*/\1/')
  if [ -s "$path" ]; then echo '"present"'; else echo '"missing"'; fi
done
"#,
        );
        let mut engine = BridgeEngine::spawn(&command, &EngineConfig::default()).unwrap();
        let outputs = engine.predict(&page()).unwrap();
        assert_eq!(outputs, vec![EngineOutput::Opaque("present".to_string())]);
    }

    #[test]
    fn engine_config_reaches_helper_environment() {
        let dir = TempDir::new().unwrap();
        let command = fake_helper(
            &dir,
            r#"while read -r line; do
  printf '["%s"]\n' "$PADDLE_PDX_MODEL_SOURCE"
done
"#,
        );
        let config = EngineConfig {
            model_source: "BOS".to_string(),
            ..EngineConfig::default()
        };
        let mut engine = BridgeEngine::spawn(&command, &config).unwrap();
        let outputs = engine.predict(&page()).unwrap();
        let expected = std::env::var("PADDLE_PDX_MODEL_SOURCE").unwrap_or_else(|_| "BOS".into());
        assert_eq!(outputs, vec![EngineOutput::Opaque(expected)]);
    }

    #[test]
    fn empty_answer_list_means_no_outputs() {
        let dir = TempDir::new().unwrap();
        let command = fake_helper(&dir, "while read -r line; do echo '[]'; done\n");
        let mut engine = BridgeEngine::spawn(&command, &EngineConfig::default()).unwrap();
        assert!(engine.predict(&page()).unwrap().is_empty());
    }

    #[test]
    fn error_answer_fails_the_page() {
        let dir = TempDir::new().unwrap();
        let command = fake_helper(
            &dir,
            r#"while read -r line; do echo '{"error":"model load failed"}'; done
"#,
        );
        let mut engine = BridgeEngine::spawn(&command, &EngineConfig::default()).unwrap();
        let err = engine.predict(&page()).unwrap_err();
        assert!(matches!(err, Error::Engine(ref msg) if msg == "model load failed"));
    }

    #[test]
    fn helper_exit_is_reported() {
        let dir = TempDir::new().unwrap();
        let command = fake_helper(&dir, "exit 0\n");
        let mut engine = BridgeEngine::spawn(&command, &EngineConfig::default()).unwrap();
        let err = engine.predict(&page()).unwrap_err();
        assert!(matches!(err, Error::BridgeExited), "got {err:?}");
    }

    #[test]
    fn garbage_answer_is_a_protocol_error() {
        let dir = TempDir::new().unwrap();
        let command = fake_helper(&dir, "while read -r line; do echo 'not json'; done\n");
        let mut engine = BridgeEngine::spawn(&command, &EngineConfig::default()).unwrap();
        let err = engine.predict(&page()).unwrap_err();
        assert!(matches!(err, Error::BridgeProtocol(_)));
    }

    #[test]
    fn null_score_drops_only_that_line() {
        let dir = TempDir::new().unwrap();
        let command = fake_helper(
            &dir,
            r#"while read -r line; do
  echo '[{"dt_polys":[[[0,0],[1,0],[1,1],[0,1]],[[0,2],[1,2],[1,3],[0,3]]],"rec_texts":["a","b"],"rec_scores":[null,0.5]}]'
done
"#,
        );
        let mut engine = BridgeEngine::spawn(&command, &EngineConfig::default()).unwrap();
        let records = crate::ocr::normalize::normalize_outputs(engine.predict(&page()).unwrap());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text(), Some("b"));
    }

    #[test]
    fn missing_program_fails_to_spawn() {
        let command = BridgeCommand {
            program: PathBuf::from("/nonexistent/pageocr-python"),
            script: PathBuf::from("helper.py"),
        };
        let err = BridgeEngine::spawn(&command, &EngineConfig::default()).err();
        assert!(matches!(err, Some(Error::BridgeSpawn { .. })));
    }

    #[test]
    fn structured_result_round_trips_through_helper() {
        let dir = TempDir::new().unwrap();
        let command = fake_helper(
            &dir,
            r#"while read -r line; do echo '{"res":{"rec_texts":["a"],"rec_scores":[0.5]}}'; done
"#,
        );
        let mut engine = BridgeEngine::spawn(&command, &EngineConfig::default()).unwrap();
        let outputs = engine.predict(&page()).unwrap();
        assert_eq!(
            outputs,
            vec![EngineOutput::Structured(StructuredResult {
                rec_texts: Some(vec![Some("a".to_string())]),
                rec_scores: Some(vec![Some(0.5)]),
                ..StructuredResult::default()
            })]
        );
    }
}
