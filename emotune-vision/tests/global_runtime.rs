//! The process-wide runtime lives in a static, so this file holds a single
//! test to keep the before/after ordering deterministic.

mod common;

use common::*;
use emotune_vision::{classifier, ClassifierRuntime, Error, InputSize, LabelMap, Pipeline};

#[test]
fn test_global_runtime_lifecycle() {
    init_logging();

    assert!(!classifier::is_loaded());
    assert!(matches!(classifier::global(), Err(Error::ModelNotLoaded)));
    assert!(matches!(
        Pipeline::from_global(Box::new(LitAreaLocator), 5),
        Err(Error::ModelNotLoaded)
    ));

    let runtime = ClassifierRuntime::new(
        Box::new(BrightnessModel),
        LabelMap::new(["happy", "sad"]).unwrap(),
        InputSize::default(),
    );
    classifier::install(runtime).unwrap();
    assert!(classifier::is_loaded());

    let pipeline = Pipeline::from_global(Box::new(LitAreaLocator), 5).unwrap();
    let outcome = pipeline.detect_single(&face_image(255)).unwrap();
    assert_eq!(outcome.emotion().unwrap().label, "happy");

    let second = ClassifierRuntime::new(
        Box::new(BrightnessModel),
        LabelMap::new(["other"]).unwrap(),
        InputSize::default(),
    );
    assert!(matches!(
        classifier::install(second),
        Err(Error::AlreadyInitialized)
    ));
    assert_eq!(classifier::global().unwrap().labels().len(), 2);
}
