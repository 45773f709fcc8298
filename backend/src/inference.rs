use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use log::{debug, info};
use once_cell::sync::{Lazy, OnceCell};
use serde::{Deserialize, Serialize};
use tract_onnx::prelude::*;

use crate::config::AssetPaths;
use crate::error::{AssetError, PredictError, PredictResult};
use crate::models::{
    Crop, DiseaseLabel, FeatureRow, FeatureValue, PredictionRequest, CATEGORICAL_FEATURES,
    FEATURE_COLUMNS,
};

/// Anything that maps a feature row to a class index.
pub trait Classifier: Send + Sync {
    fn predict_class(&self, row: &FeatureRow) -> PredictResult<usize>;

    fn name(&self) -> &str {
        "classifier"
    }
}

/// ONNX classifier evaluated with tract. Expects a `[1, n_features]` f32 input
/// and answers with either a class index tensor or a `[1, n_classes]` score tensor.
pub struct OnnxClassifier {
    model: TypedRunnableModel<TypedModel>,
    width: usize,
    vocabularies: HashMap<&'static str, Vec<&'static str>>,
}

impl OnnxClassifier {
    pub fn load<P: AsRef<Path>>(model_path: P) -> Result<Self, AssetError> {
        let path = model_path.as_ref();
        if !path.exists() {
            return Err(AssetError::Missing(path.to_path_buf()));
        }

        let width = FEATURE_COLUMNS.len();
        let model = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|m| {
                m.with_input_fact(
                    0,
                    InferenceFact::dt_shape(f32::datum_type(), tvec!(1, width)),
                )
            })
            .and_then(|m| m.into_optimized())
            .and_then(|m| m.into_runnable())
            .map_err(|e| AssetError::CorruptModel {
                path: path.to_path_buf(),
                reason: format!("{e:#}"),
            })?;

        Ok(Self {
            model,
            width,
            vocabularies: default_vocabularies(),
        })
    }
}

impl Classifier for OnnxClassifier {
    fn predict_class(&self, row: &FeatureRow) -> PredictResult<usize> {
        let features = encode_row(row, self.width, &self.vocabularies)?;
        let input = Tensor::from_shape(&[1, self.width], features.as_slice())
            .map_err(|e| PredictError::Model(e.to_string()))?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .map_err(|e| PredictError::Model(format!("{e:#}")))?;

        let first = outputs.first().ok_or(PredictError::EmptyOutput)?;
        class_index(first)
    }

    fn name(&self) -> &str {
        "onnx"
    }
}

/// Categorical columns are fed to the graph as their position in the crop list.
fn default_vocabularies() -> HashMap<&'static str, Vec<&'static str>> {
    let mut vocabularies = HashMap::new();
    vocabularies.insert(CATEGORICAL_FEATURES[0], Crop::names());
    vocabularies
}

fn encode_row(
    row: &FeatureRow,
    width: usize,
    vocabularies: &HashMap<&'static str, Vec<&'static str>>,
) -> PredictResult<Vec<f32>> {
    if row.len() != width {
        return Err(PredictError::FeatureShape {
            expected: width,
            actual: row.len(),
        });
    }

    row.columns()
        .iter()
        .map(|(column, value)| match value {
            FeatureValue::Categorical(category) => vocabularies
                .get(column)
                .and_then(|vocab| vocab.iter().position(|v| v == category))
                .map(|pos| pos as f32)
                .ok_or_else(|| PredictError::UnknownCategory {
                    column: column.to_string(),
                    value: category.clone(),
                }),
            FeatureValue::Float(v) => Ok(*v),
            FeatureValue::Flag(v) => Ok(f32::from(*v)),
        })
        .collect()
}

fn class_index(output: &Tensor) -> PredictResult<usize> {
    let bad = |e: TractError| PredictError::Model(e.to_string());

    match output.datum_type() {
        DatumType::I64 => {
            let view = output.to_array_view::<i64>().map_err(bad)?;
            let idx = *view.iter().next().ok_or(PredictError::EmptyOutput)?;
            usize::try_from(idx).map_err(|_| PredictError::Model(format!("negative class {idx}")))
        }
        DatumType::I32 => {
            let view = output.to_array_view::<i32>().map_err(bad)?;
            let idx = *view.iter().next().ok_or(PredictError::EmptyOutput)?;
            usize::try_from(idx).map_err(|_| PredictError::Model(format!("negative class {idx}")))
        }
        DatumType::F32 => {
            let view = output.to_array_view::<f32>().map_err(bad)?;
            view.iter()
                .enumerate()
                .max_by(|(_, a), (_, b)| a.total_cmp(b))
                .map(|(i, _)| i)
                .ok_or(PredictError::EmptyOutput)
        }
        other => Err(PredictError::Model(format!(
            "unsupported output type {other:?}"
        ))),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DecoderFile {
    Wrapped { classes: Vec<String> },
    Bare(Vec<String>),
}

/// Maps class indices back to disease names, like a fitted label encoder.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelDecoder {
    classes: Vec<String>,
}

impl LabelDecoder {
    pub fn from_classes(classes: Vec<String>) -> Result<Self, String> {
        if classes.is_empty() {
            return Err("empty class list".to_string());
        }
        for (i, class) in classes.iter().enumerate() {
            if classes[..i].contains(class) {
                return Err(format!("duplicate class '{class}'"));
            }
        }
        Ok(Self { classes })
    }

    pub fn load<P: AsRef<Path>>(decoder_path: P) -> Result<Self, AssetError> {
        let path = decoder_path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => AssetError::Missing(path.to_path_buf()),
            _ => AssetError::Io {
                path: path.to_path_buf(),
                source,
            },
        })?;

        let corrupt = |reason: String| AssetError::CorruptDecoder {
            path: path.to_path_buf(),
            reason,
        };

        let classes = match serde_json::from_str::<DecoderFile>(&raw) {
            Ok(DecoderFile::Wrapped { classes }) | Ok(DecoderFile::Bare(classes)) => classes,
            Err(e) => return Err(corrupt(e.to_string())),
        };

        Self::from_classes(classes).map_err(corrupt)
    }

    pub fn inverse_transform(&self, index: usize) -> PredictResult<DiseaseLabel> {
        self.classes
            .get(index)
            .map(DiseaseLabel::new)
            .ok_or(PredictError::UnknownClassIndex {
                index,
                classes: self.classes.len(),
            })
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }
}

/// Classifier and decoder loaded together; shared read-only by every request.
pub struct ModelInference {
    classifier: Box<dyn Classifier>,
    decoder: LabelDecoder,
}

impl ModelInference {
    pub fn new(classifier: Box<dyn Classifier>, decoder: LabelDecoder) -> Self {
        Self {
            classifier,
            decoder,
        }
    }

    pub fn from_paths(paths: &AssetPaths) -> Result<Self, AssetError> {
        let decoder = LabelDecoder::load(&paths.decoder)?;
        info!(
            "🏷️ Label decoder loaded: {} classes from {:?}",
            decoder.classes().len(),
            paths.decoder
        );
        let classifier = OnnxClassifier::load(&paths.model)?;
        info!("🧠 Classifier loaded from {:?}", paths.model);

        Ok(Self::new(Box::new(classifier), decoder))
    }

    /// Builds the feature row, runs the classifier and decodes the class index.
    pub fn predict(&self, request: &PredictionRequest) -> PredictResult<DiseaseLabel> {
        let row = request.to_feature_row();
        let index = self.classifier.predict_class(&row)?;
        let label = self.decoder.inverse_transform(index)?;
        debug!("class index {} decoded as {}", index, label);
        Ok(label)
    }

    pub fn decoder(&self) -> &LabelDecoder {
        &self.decoder
    }

    pub fn get_model_info(&self) -> ModelInfo {
        ModelInfo {
            runtime: self.classifier.name().to_string(),
            features: FEATURE_COLUMNS.to_vec(),
            categorical_features: CATEGORICAL_FEATURES.to_vec(),
            classes: self.decoder.classes().to_vec(),
            crops: Crop::names(),
        }
    }
}

#[derive(Serialize)]
pub struct ModelInfo {
    pub runtime: String,
    pub features: Vec<&'static str>,
    pub categorical_features: Vec<&'static str>,
    pub classes: Vec<String>,
    pub crops: Vec<&'static str>,
}

pub type LoadFn = fn(&AssetPaths) -> Result<ModelInference, AssetError>;

/// Load-once cache for the inference assets. Concurrent callers wait for the
/// first load; a failed load leaves the cache empty.
pub struct AssetLoader {
    paths: AssetPaths,
    load_fn: LoadFn,
    cell: OnceCell<Arc<ModelInference>>,
}

impl AssetLoader {
    pub fn new(paths: AssetPaths) -> Self {
        Self::with_loader(paths, ModelInference::from_paths)
    }

    pub fn with_loader(paths: AssetPaths, load_fn: LoadFn) -> Self {
        Self {
            paths,
            load_fn,
            cell: OnceCell::new(),
        }
    }

    pub fn load(&self) -> Result<Arc<ModelInference>, AssetError> {
        self.cell
            .get_or_try_init(|| (self.load_fn)(&self.paths).map(Arc::new))
            .map(Arc::clone)
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }
}

static ASSETS: Lazy<AssetLoader> = Lazy::new(|| AssetLoader::new(AssetPaths::default()));

/// Process-wide assets from the fixed paths in the working directory.
pub fn load_assets() -> Result<Arc<ModelInference>, AssetError> {
    ASSETS.load()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::thread;

    struct FixedClass(usize);

    impl Classifier for FixedClass {
        fn predict_class(&self, _row: &FeatureRow) -> PredictResult<usize> {
            Ok(self.0)
        }
    }

    struct Recording {
        index: usize,
        seen: Mutex<Vec<FeatureRow>>,
    }

    impl Classifier for Recording {
        fn predict_class(&self, row: &FeatureRow) -> PredictResult<usize> {
            self.seen.lock().unwrap().push(row.clone());
            Ok(self.index)
        }
    }

    fn classes() -> Vec<String> {
        ["Bacterial", "Fungal", "Healthy", "Pest", "Viral"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn decoder() -> LabelDecoder {
        LabelDecoder::from_classes(classes()).unwrap()
    }

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn decoder_accepts_wrapped_and_bare_lists() {
        let wrapped = write_temp(r#"{"classes": ["Bacterial", "Fungal", "Healthy"]}"#);
        let bare = write_temp(r#"["Bacterial", "Fungal", "Healthy"]"#);
        let a = LabelDecoder::load(wrapped.path()).unwrap();
        let b = LabelDecoder::load(bare.path()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.inverse_transform(1).unwrap().as_str(), "Fungal");
    }

    #[test]
    fn decoder_rejects_corrupt_files() {
        for contents in ["not json", r#"{"classes": []}"#, r#"["Pest", "Pest"]"#, "{}"] {
            let file = write_temp(contents);
            match LabelDecoder::load(file.path()) {
                Err(AssetError::CorruptDecoder { .. }) => {}
                other => panic!("expected corrupt decoder for {contents:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn missing_artifacts_are_reported_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let decoder = dir.path().join("absent.json");
        let model = dir.path().join("absent.onnx");

        assert!(matches!(LabelDecoder::load(&decoder), Err(AssetError::Missing(p)) if p == decoder));
        assert!(matches!(OnnxClassifier::load(&model), Err(AssetError::Missing(p)) if p == model));
    }

    #[test]
    fn garbage_model_is_corrupt() {
        let file = write_temp("this is not an onnx graph");
        assert!(matches!(
            OnnxClassifier::load(file.path()),
            Err(AssetError::CorruptModel { .. })
        ));
    }

    #[test]
    fn from_paths_fails_when_model_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let decoder = dir.path().join("enc.json");
        fs::write(&decoder, r#"{"classes": ["Healthy"]}"#).unwrap();
        let paths = AssetPaths {
            model: dir.path().join("model.onnx"),
            decoder,
        };
        assert!(matches!(
            ModelInference::from_paths(&paths),
            Err(AssetError::Missing(_))
        ));
    }

    #[test]
    fn out_of_range_index_is_an_error() {
        let err = decoder().inverse_transform(9).unwrap_err();
        assert!(matches!(
            err,
            PredictError::UnknownClassIndex { index: 9, classes: 5 }
        ));
    }

    #[test]
    fn predict_decodes_classifier_output() {
        let inference = ModelInference::new(Box::new(FixedClass(1)), decoder());
        let label = inference.predict(&PredictionRequest::default()).unwrap();
        assert_eq!(label.as_str(), "Fungal");
        assert!(classes().contains(&label.as_str().to_string()));
    }

    #[test]
    fn classifier_receives_the_exact_feature_row() {
        let recording = Arc::new(Recording {
            index: 2,
            seen: Mutex::new(Vec::new()),
        });

        struct Shared(Arc<Recording>);
        impl Classifier for Shared {
            fn predict_class(&self, row: &FeatureRow) -> PredictResult<usize> {
                self.0.predict_class(row)
            }
        }

        let inference = ModelInference::new(Box::new(Shared(recording.clone())), decoder());
        let request = PredictionRequest {
            leaf_spots: true,
            wilting: true,
            ..PredictionRequest::default()
        };
        inference.predict(&request).unwrap();

        let seen = recording.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let row = &seen[0];
        assert_eq!(row.get("Crop"), Some(&FeatureValue::Categorical("Tomato".into())));
        assert_eq!(row.get("Leaf_Spots"), Some(&FeatureValue::Flag(1)));
        assert_eq!(row.get("Wilting"), Some(&FeatureValue::Flag(1)));
        assert_eq!(row.categorical_columns(), &["Crop"]);
    }

    #[test]
    fn encode_row_maps_crop_to_ordinal() {
        let request = PredictionRequest {
            crop: Crop::Wheat,
            leaf_spots: true,
            ..PredictionRequest::default()
        };
        let encoded = encode_row(
            &request.to_feature_row(),
            FEATURE_COLUMNS.len(),
            &default_vocabularies(),
        )
        .unwrap();
        assert_eq!(encoded, vec![3.0, 25.0, 50.0, 150.0, 6.5, 40.0, 1.0, 0.0]);
    }

    #[test]
    fn encode_row_checks_width() {
        let row = PredictionRequest::default().to_feature_row();
        let err = encode_row(&row, 7, &default_vocabularies()).unwrap_err();
        assert!(matches!(err, PredictError::FeatureShape { expected: 7, actual: 8 }));
    }

    #[test]
    fn encode_row_rejects_categories_without_vocabulary() {
        let row = PredictionRequest::default().to_feature_row();
        let err = encode_row(&row, FEATURE_COLUMNS.len(), &HashMap::new()).unwrap_err();
        assert!(matches!(err, PredictError::UnknownCategory { .. }));
    }

    #[test]
    fn class_index_reads_labels_and_scores() {
        assert_eq!(class_index(&tensor1(&[3i64])).unwrap(), 3);
        assert_eq!(class_index(&tensor1(&[0i32])).unwrap(), 0);
        assert_eq!(
            class_index(&tensor2(&[[0.1f32, 0.7, 0.2]])).unwrap(),
            1
        );
        assert!(class_index(&tensor1(&[-1i64])).is_err());
        assert!(matches!(
            class_index(&tensor1::<f32>(&[])),
            Err(PredictError::EmptyOutput)
        ));
    }

    static LOADS: AtomicUsize = AtomicUsize::new(0);

    fn counting_loader(_: &AssetPaths) -> Result<ModelInference, AssetError> {
        LOADS.fetch_add(1, Ordering::SeqCst);
        Ok(ModelInference::new(Box::new(FixedClass(0)), decoder()))
    }

    #[test]
    fn loader_loads_once_across_threads() {
        let loader = Arc::new(AssetLoader::with_loader(AssetPaths::default(), counting_loader));
        assert!(!loader.is_loaded());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let loader = loader.clone();
                thread::spawn(move || loader.load().unwrap())
            })
            .collect();
        let loaded: Vec<Arc<ModelInference>> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(LOADS.load(Ordering::SeqCst), 1);
        assert!(loaded.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert!(loader.is_loaded());
    }

    #[test]
    fn failed_load_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AssetPaths {
            model: dir.path().join("model.onnx"),
            decoder: dir.path().join("enc.json"),
        };
        let loader = AssetLoader::new(paths);
        assert!(matches!(loader.load(), Err(AssetError::Missing(_))));
        assert!(!loader.is_loaded());
        assert!(loader.load().is_err());
    }
}
