use std::sync::{Arc, Mutex};

use chem_forge::engine::{
    CancelToken, Error, OwnedInput, ProgressReport, ProgressSink, Shape, Transformed, Value,
};
use chem_forge::io::{Notation, Smiles};
use chem_forge::ops::{
    self, MolecularWeight, MorganFingerprint, MorganOptions, Output, OutputKind, TransformUnit,
    UnitConfig, UnitKind,
};
use chem_forge::{Collection, Engine, Slot, Structure, transform};

fn collection(items: &[(&str, &str)]) -> Collection {
    items
        .iter()
        .map(|(label, text)| (*label, Smiles.parse(text).unwrap()))
        .collect()
}

fn library() -> Collection {
    collection(&[
        ("ethanol", "CCO"),
        ("benzene", "c1ccccc1"),
        ("acetate", "CC(=O)[O-]"),
        ("pyridine", "c1ccncc1"),
        ("glycine", "NCC(=O)O"),
        ("propane", "CCC"),
        ("phenol", "Oc1ccccc1"),
        ("urea", "NC(=O)N"),
    ])
}

/// Fails on structures with an odd number of heavy atoms.
struct OddRejecter {
    config: UnitConfig,
}

impl TransformUnit for OddRejecter {
    fn name(&self) -> &str {
        "OddRejecter"
    }

    fn kind(&self) -> UnitKind {
        UnitKind::FeatureExtractor
    }

    fn output_kind(&self) -> OutputKind {
        OutputKind::Scalar
    }

    fn config(&self) -> &UnitConfig {
        &self.config
    }

    fn config_mut(&mut self) -> &mut UnitConfig {
        &mut self.config
    }

    fn apply(&self, structure: &mut Structure) -> Result<Output, ops::Error> {
        let heavy = structure.heavy_atom_count();
        if heavy % 2 == 1 {
            Err(ops::Error::rejected("odd heavy-atom count"))
        } else {
            Ok(Output::Scalar(heavy as f64))
        }
    }
}

/// Declares a vector but returns a scalar.
struct Liar {
    config: UnitConfig,
}

impl TransformUnit for Liar {
    fn name(&self) -> &str {
        "Liar"
    }

    fn kind(&self) -> UnitKind {
        UnitKind::FeatureExtractor
    }

    fn output_kind(&self) -> OutputKind {
        OutputKind::Vector { len: 3 }
    }

    fn config(&self) -> &UnitConfig {
        &self.config
    }

    fn config_mut(&mut self) -> &mut UnitConfig {
        &mut self.config
    }

    fn apply(&self, _structure: &mut Structure) -> Result<Output, ops::Error> {
        Ok(Output::Scalar(1.0))
    }
}

/// Loses its collaborator on structures with exactly three heavy atoms.
struct FlakyService {
    config: UnitConfig,
}

impl TransformUnit for FlakyService {
    fn name(&self) -> &str {
        "FlakyService"
    }

    fn kind(&self) -> UnitKind {
        UnitKind::FeatureExtractor
    }

    fn output_kind(&self) -> OutputKind {
        OutputKind::Scalar
    }

    fn config(&self) -> &UnitConfig {
        &self.config
    }

    fn config_mut(&mut self) -> &mut UnitConfig {
        &mut self.config
    }

    fn apply(&self, structure: &mut Structure) -> Result<Output, ops::Error> {
        match structure.heavy_atom_count() {
            3 => Err(ops::Error::unavailable("svc", "connection lost")),
            n => Ok(Output::Scalar(n as f64)),
        }
    }
}

#[derive(Default)]
struct Recorder {
    reports: Mutex<Vec<ProgressReport>>,
    finished: Mutex<Option<ProgressReport>>,
    abandoned: Mutex<Option<ProgressReport>>,
    cancel_after: Option<(usize, CancelToken)>,
}

impl Recorder {
    fn cancelling(after: usize, token: CancelToken) -> Self {
        Self {
            cancel_after: Some((after, token)),
            ..Self::default()
        }
    }
}

impl ProgressSink for Recorder {
    fn update(&self, report: &ProgressReport) {
        self.reports.lock().unwrap().push(*report);
        if let Some((after, token)) = &self.cancel_after {
            if report.processed >= *after {
                token.cancel();
            }
        }
    }

    fn finish(&self, report: &ProgressReport) {
        *self.finished.lock().unwrap() = Some(*report);
    }

    fn abandon(&self, report: &ProgressReport) {
        *self.abandoned.lock().unwrap() = Some(*report);
    }
}

#[test]
fn collection_output_keeps_length_order_and_labels() {
    let mut input = library();
    let unit = MolecularWeight::new().with_config(UnitConfig::default().with_parallelism(4));

    let result = transform(&mut input, &unit).unwrap();

    assert_eq!(result.len(), input.len());
    assert_eq!(result.labels(), input.labels().as_slice());
    let series = result.as_series().unwrap();
    let ethanol = series.get("ethanol").unwrap().value().and_then(Value::as_scalar).unwrap();
    assert!((ethanol - 46.069).abs() < 0.01);
}

#[test]
fn rank_is_promoted_by_one_for_collections() {
    let mut single = Smiles.parse("CCO").unwrap();
    let mut many = library();
    let scalar = MolecularWeight::new();
    let vector = MorganFingerprint::new(MorganOptions {
        n_bits: 64,
        ..MorganOptions::default()
    });

    let cases = [
        (transform(&mut single, &scalar).unwrap(), Shape::Value, 0),
        (transform(&mut many, &scalar).unwrap(), Shape::Series, 1),
        (transform(&mut single, &vector).unwrap(), Shape::Vector, 1),
        (transform(&mut many, &vector).unwrap(), Shape::Frame, 2),
    ];

    for (result, shape, rank) in cases {
        assert_eq!(result.shape(), shape);
        assert_eq!(result.rank(), rank);
    }
}

#[test]
fn fingerprint_of_single_is_vector_and_of_one_item_collection_is_table() {
    let unit = MorganFingerprint::new(MorganOptions::default());
    let mut single = Smiles.parse("c1ccccc1O").unwrap();
    let mut batch = collection(&[("phenol", "c1ccccc1O")]);

    let vector = transform(&mut single, &unit).unwrap();
    let frame = transform(&mut batch, &unit).unwrap();

    assert_eq!(vector.as_vector().unwrap().value().unwrap().len(), 2048);
    let frame = frame.as_frame().unwrap();
    assert_eq!((frame.len(), frame.width()), (1, 2048));
    assert_eq!(frame.to_array(0.0).dim(), (1, 2048));
}

#[test]
fn per_item_failures_do_not_abort_the_batch() {
    let mut input = collection(&[("two", "CC"), ("three", "CCC"), ("four", "CCCC")]);
    let unit = OddRejecter {
        config: UnitConfig::default(),
    };

    let result = transform(&mut input, &unit).unwrap();
    let series = result.as_series().unwrap();

    assert_eq!(series.len(), 3);
    assert_eq!(series.absent_count(), 1);
    assert!(series.get("three").unwrap().is_absent());
    assert_eq!(
        series.get("four").unwrap().value().and_then(Value::as_scalar),
        Some(4.0)
    );
}

#[test]
fn parallel_runs_match_sequential_runs() {
    let unit = MorganFingerprint::new(MorganOptions {
        n_bits: 256,
        counts: true,
        ..MorganOptions::default()
    });
    let mut sequential = library();
    let mut parallel = library();

    let one = transform(&mut sequential, &unit.clone().with_config(UnitConfig::default())).unwrap();
    let four = transform(
        &mut parallel,
        &unit.with_config(UnitConfig::default().with_parallelism(4)),
    )
    .unwrap();

    assert_eq!(
        one.as_frame().unwrap().to_array(-1.0),
        four.as_frame().unwrap().to_array(-1.0)
    );
}

#[test]
fn contract_violations_are_fatal() {
    let mut input = collection(&[("a", "C")]);
    let unit = Liar {
        config: UnitConfig::default(),
    };

    let err = transform(&mut input, &unit).unwrap_err();

    assert!(matches!(err, Error::ContractViolation { ref unit, .. } if unit == "Liar"));
}

#[test]
fn invalid_options_are_reported_before_any_work() {
    let mut input = library();
    let unit = MorganFingerprint::new(MorganOptions {
        n_bits: 0,
        ..MorganOptions::default()
    });

    let err = transform(&mut input, &unit).unwrap_err();

    assert!(matches!(err, Error::InvalidConfiguration { .. }));
}

#[test]
fn progress_reaches_completion_despite_failures() {
    let recorder = Arc::new(Recorder::default());
    let engine = Engine::new().with_progress(recorder.clone());
    let unit = OddRejecter {
        config: UnitConfig::default().with_verbose(true).with_parallelism(3),
    };
    let mut input = library();

    let result = engine.transform(&mut input, &unit).unwrap();

    assert!(result.absent_count() > 0);
    let reports = recorder.reports.lock().unwrap();
    assert_eq!(reports.len(), input.len());
    assert!(reports.iter().all(|r| r.total == input.len()));
    let finished = recorder.finished.lock().unwrap().unwrap();
    assert_eq!(finished.processed, input.len());
    assert_eq!(finished.fraction(), 1.0);
}

#[test]
fn cancelled_runs_return_cancelled() {
    let engine = Engine::new();
    let token = engine.cancel_token().clone();
    token.cancel();
    let mut input = library();

    let err = engine.transform(&mut input, &MolecularWeight::new()).unwrap_err();
    assert!(matches!(err, Error::Cancelled { total: 8, .. }));

    token.reset();
    assert!(engine.transform(&mut input, &MolecularWeight::new()).is_ok());
}

#[test]
fn text_input_decides_cardinality() {
    let mut single = OwnedInput::parse("CCO\n", &Smiles).unwrap();
    let mut many = OwnedInput::parse("CCO ethanol\nC(C broken\n", &Smiles).unwrap();

    let one = transform(single.as_input(), &MolecularWeight::new()).unwrap();
    let two = transform(many.as_input(), &MolecularWeight::new()).unwrap();

    assert_eq!(one.shape(), Shape::Value);
    assert_eq!(two.shape(), Shape::Series);
    assert!(two.as_series().unwrap().get("broken").unwrap().is_absent());
    assert!(matches!(
        OwnedInput::parse("\n# nothing\n", &Smiles),
        Err(Error::InvalidInput { .. })
    ));
}

#[test]
fn absent_single_item_stays_absent() {
    let mut slot: Slot<Structure> = Slot::absent("unparseable");

    let result: Transformed = transform(&mut slot, &MolecularWeight::new()).unwrap();

    assert_eq!(result.as_value().unwrap().absence().unwrap().reason, "unparseable");
}

#[test]
fn collaborator_loss_mid_batch_returns_no_partial_result() {
    let recorder = Arc::new(Recorder::default());
    let engine = Engine::new().with_progress(recorder.clone());
    let unit = FlakyService {
        config: UnitConfig::default().with_verbose(true),
    };
    let mut input = collection(&[("a", "C"), ("b", "CC"), ("c", "CCC"), ("d", "CCCC")]);

    let err = engine.transform(&mut input, &unit).unwrap_err();

    assert!(matches!(
        err,
        Error::CollaboratorUnavailable { ref collaborator, .. } if collaborator == "svc"
    ));
    let processed: Vec<usize> = recorder
        .reports
        .lock()
        .unwrap()
        .iter()
        .map(|r| r.processed)
        .collect();
    assert_eq!(processed, vec![1, 2]);
    assert!(recorder.finished.lock().unwrap().is_none());
    let abandoned = recorder.abandoned.lock().unwrap().unwrap();
    assert!(abandoned.fraction() < 1.0);
}

#[test]
fn cancel_during_a_run_stops_at_the_next_item() {
    let engine = Engine::new();
    let recorder = Arc::new(Recorder::cancelling(2, engine.cancel_token().clone()));
    let engine = engine.with_progress(recorder.clone());
    let unit = MolecularWeight::new().with_config(UnitConfig::default().with_verbose(true));
    let mut input = collection(&[
        ("a", "C"),
        ("b", "CC"),
        ("c", "CCC"),
        ("d", "CCCC"),
        ("e", "CCCCC"),
    ]);

    let err = engine.transform(&mut input, &unit).unwrap_err();

    assert!(matches!(err, Error::Cancelled { processed: 2, total: 5 }));
    assert_eq!(recorder.reports.lock().unwrap().len(), 2);
    assert!(recorder.finished.lock().unwrap().is_none());
    assert_eq!(recorder.abandoned.lock().unwrap().unwrap().processed, 2);
}
