use std::ffi::OsString;
use std::path::PathBuf;

/// Settings handed to the OCR engine when it starts.
///
/// The numeric-library and model-source knobs become environment variables of
/// the engine process only. Variables the user already exported are left alone.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub lang: String,
    pub model_source_check: bool,
    pub model_source: String,
    pub num_threads: usize,
    pub doc_orientation_classify: bool,
    pub doc_unwarping: bool,
    pub textline_orientation: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lang: "en".to_string(),
            model_source_check: false,
            model_source: "HF".to_string(),
            num_threads: 1,
            doc_orientation_classify: false,
            doc_unwarping: false,
            textline_orientation: false,
        }
    }
}

impl EngineConfig {
    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    /// Environment entries the engine process should see, given a lookup into
    /// the environment it would otherwise inherit.
    pub fn child_env<F>(&self, inherited: F) -> Vec<(&'static str, String)>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let threads = self.num_threads.max(1).to_string();
        let wanted = [
            (
                "DISABLE_MODEL_SOURCE_CHECK",
                if self.model_source_check { "False" } else { "True" }.to_string(),
            ),
            ("PADDLE_PDX_MODEL_SOURCE", self.model_source.clone()),
            ("OMP_NUM_THREADS", threads.clone()),
            ("VECLIB_MAXIMUM_THREADS", threads),
        ];
        wanted
            .into_iter()
            .filter(|(key, _)| inherited(*key).is_none())
            .collect()
    }

    /// Command-line arguments for the bridge helper.
    pub fn bridge_args(&self) -> Vec<String> {
        let mut args = vec!["--lang".to_string(), self.lang.clone()];
        if self.doc_orientation_classify {
            args.push("--doc-orientation-classify".to_string());
        }
        if self.doc_unwarping {
            args.push("--doc-unwarping".to_string());
        }
        if self.textline_orientation {
            args.push("--textline-orientation".to_string());
        }
        args
    }
}

/// How to launch the OCR bridge helper.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeCommand {
    pub program: PathBuf,
    pub script: PathBuf,
}

impl Default for BridgeCommand {
    fn default() -> Self {
        Self {
            program: PathBuf::from("python3"),
            script: PathBuf::from("ocr/bridge/paddle_bridge.py"),
        }
    }
}
