// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use ifc_glb_convert::{
    BackendKind, BackendMode, Converter, ConverterConfig, Error, ExportError, ExtractionResult,
    FallbackBackend, GltfBinaryExporter, IfcParser, JobEvent, JobId, JobStatus, NativeSource,
    Readiness, SceneExporter, SceneGraph,
};
use ifc_glb_model::{ParseError, ProgressCallback};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

const WALL_IFC: &str = r#"ISO-10303-21;
HEADER;
FILE_DESCRIPTION((''),'2;1');
FILE_NAME('wall.ifc','',(''),(''),'','','');
FILE_SCHEMA(('IFC4'));
ENDSEC;
DATA;
#1=IFCPROJECT('0aB7rqQ4n0WOxTHa0iyO8g',$,'Wall',$,$,$,$,$,#2);
#2=IFCUNITASSIGNMENT((#3));
#3=IFCSIUNIT(*,.LENGTHUNIT.,$,.METRE.);
#10=IFCCARTESIANPOINT((0.,0.,0.));
#11=IFCAXIS2PLACEMENT3D(#10,$,$);
#12=IFCCARTESIANPOINT((1.,2.,0.));
#13=IFCAXIS2PLACEMENT3D(#12,$,$);
#14=IFCLOCALPLACEMENT($,#13);
#16=IFCDIRECTION((0.,0.,1.));
#20=IFCRECTANGLEPROFILEDEF(.AREA.,$,$,4.,0.2);
#21=IFCEXTRUDEDAREASOLID(#20,#11,#16,3.);
#22=IFCSHAPEREPRESENTATION($,'Body','SweptSolid',(#21));
#23=IFCPRODUCTDEFINITIONSHAPE($,$,(#22));
#30=IFCWALL('2hQBAVPOr5VxhS3Jl0O47h',$,'Wall',$,$,#14,#23,$,$);
#31=IFCWINDOW('1n2yBA9zX6aAdVp4UWquh0',$,'Window',$,$,#14,#23,$,$,1.2,1.,$,$,$);
ENDSEC;
END-ISO-10303-21;
"#;

const THREE_LINES: &str = "#1=IFCWALL('a');\n#2=IFCWALL('b');\n#3=IFCSLAB('c');\n";

fn config(mode: BackendMode) -> ConverterConfig {
    ConverterConfig {
        backend: mode,
        fallback_seed: Some(7),
        ..ConverterConfig::default()
    }
}

fn ready(mode: BackendMode) -> Converter {
    let mut converter = Converter::new(config(mode)).unwrap();
    converter.initialize().unwrap();
    converter
}

/// JSON chunk of a GLB
fn glb_json(glb: &[u8]) -> serde_json::Value {
    let len = u32::from_le_bytes([glb[12], glb[13], glb[14], glb[15]]) as usize;
    serde_json::from_slice(&glb[20..20 + len]).unwrap()
}

/// Records every event along with the number of converting jobs at that moment
fn record(converter: &Converter) -> Arc<Mutex<Vec<(JobEvent, usize)>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let observer = converter.observer();
    converter.subscribe(move |event| {
        sink.lock().push((event.clone(), observer.converting_count()));
    });
    events
}

struct FailingSource;

impl NativeSource for FailingSource {
    fn name(&self) -> &str {
        "unreachable-cdn"
    }

    fn load(&self) -> ifc_glb_model::Result<Box<dyn IfcParser>> {
        Err(ParseError::other("engine not installed"))
    }
}

/// Fallback parsing, except that one file name makes it panic
struct ExplodingBackend;

impl IfcParser for ExplodingBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Native
    }

    fn parse_with_progress(
        &self,
        content: &[u8],
        file_name: &str,
        on_progress: ProgressCallback<'_>,
    ) -> ifc_glb_model::Result<ExtractionResult> {
        if file_name == "boom.ifc" {
            panic!("attempt to subtract with overflow");
        }
        FallbackBackend::new(Some(1)).parse_with_progress(content, file_name, on_progress)
    }
}

struct ExplodingSource;

impl NativeSource for ExplodingSource {
    fn name(&self) -> &str {
        "exploding"
    }

    fn load(&self) -> ifc_glb_model::Result<Box<dyn IfcParser>> {
        Ok(Box::new(ExplodingBackend))
    }
}

/// Refuses to export one scene by name
struct RefuseScene {
    name: &'static str,
    inner: GltfBinaryExporter,
}

impl SceneExporter for RefuseScene {
    fn export(&self, scene: &SceneGraph) -> Result<Vec<u8>, ExportError> {
        if scene.name == self.name {
            return Err(ExportError::new("exporter returned no binary buffer"));
        }
        self.inner.export(scene)
    }
}

#[test]
fn three_declarations_give_three_geometries() {
    let mut converter = ready(BackendMode::Fallback);
    let id = converter.enqueue([("lines.ifc", THREE_LINES.as_bytes().to_vec())])[0];
    converter.convert_all().unwrap();

    let job = converter.job(id).unwrap();
    assert_eq!(job.status, JobStatus::Success);
    let output = job.result.unwrap();
    assert_eq!(output.geometry_count, 3);
    assert_eq!(output.material_count, 2);
    assert_eq!(output.backend, BackendKind::Fallback);
}

#[test]
fn empty_buffer_gets_the_scaffold_room() {
    let mut converter = ready(BackendMode::Fallback);
    let id = converter.enqueue([("empty.ifc", Vec::<u8>::new())])[0];
    converter.convert_all().unwrap();

    let output = converter.job(id).unwrap().result.unwrap();
    assert_eq!(output.geometry_count, 7);
    assert!(output.material_count <= 3);
}

#[test]
fn failed_sources_commit_the_session_to_fallback() {
    let mut converter = Converter::new(config(BackendMode::Auto))
        .unwrap()
        .with_sources(vec![
            Arc::new(FailingSource) as Arc<dyn NativeSource>,
            Arc::new(FailingSource),
        ]);
    assert_eq!(
        converter.initialize().unwrap(),
        &Readiness::Fallback {
            message: ifc_glb_convert::FALLBACK_MESSAGE.to_string()
        }
    );

    let ids = converter.enqueue([
        ("wall.ifc", WALL_IFC.as_bytes().to_vec()),
        ("notes.ifc", b"just some text".to_vec()),
    ]);
    converter.convert_all().unwrap();

    for id in ids {
        let output = converter.job(id).unwrap().result.unwrap();
        assert_eq!(output.backend, BackendKind::Fallback);
    }
}

#[test]
fn export_failure_fails_only_that_job() {
    let mut converter = Converter::new(config(BackendMode::Fallback))
        .unwrap()
        .with_exporter(RefuseScene {
            name: "b",
            inner: GltfBinaryExporter::default(),
        });
    converter.initialize().unwrap();
    let events = record(&converter);

    let ids = converter.enqueue([
        ("a.ifc", THREE_LINES.as_bytes().to_vec()),
        ("b.ifc", THREE_LINES.as_bytes().to_vec()),
        ("c.ifc", THREE_LINES.as_bytes().to_vec()),
    ]);
    let summary = converter.convert_all().unwrap();
    assert_eq!((summary.succeeded, summary.failed), (2, 1));

    let statuses: Vec<JobStatus> = ids
        .iter()
        .map(|&id| converter.job(id).unwrap().status)
        .collect();
    assert_eq!(
        statuses,
        vec![JobStatus::Success, JobStatus::Failed, JobStatus::Success]
    );
    let failed = converter.job(ids[1]).unwrap();
    assert_eq!(
        failed.error.as_deref(),
        Some("Export failed: exporter returned no binary buffer")
    );
    assert!(failed.result.is_none());

    let last_batch = events
        .lock()
        .iter()
        .rev()
        .find_map(|(event, _)| match event {
            JobEvent::BatchProgress { percent, .. } => Some(*percent),
            _ => None,
        });
    assert_eq!(last_batch, Some(100.0));

    let names: Vec<String> = converter
        .artifacts()
        .into_iter()
        .map(|a| a.file_name)
        .collect();
    assert_eq!(names, vec!["a.glb", "c.glb"]);
}

#[test]
fn batch_of_five_runs_one_at_a_time() {
    let mut converter = ready(BackendMode::Auto);
    assert!(matches!(converter.readiness(), Readiness::Native { .. }));
    let events = record(&converter);

    converter.enqueue([
        ("wall-1.ifc", WALL_IFC.as_bytes().to_vec()),
        ("broken.ifc", b"not an ifc file".to_vec()),
        ("wall-2.ifc", WALL_IFC.as_bytes().to_vec()),
        ("empty.ifc", Vec::new()),
        ("wall-3.ifc", WALL_IFC.as_bytes().to_vec()),
    ]);
    let summary = converter.convert_all().unwrap();

    assert_eq!(summary.total, 5);
    assert_eq!(summary.succeeded + summary.failed, 5);
    assert_eq!(summary.failed, 2);
    assert!(events.lock().iter().all(|(_, converting)| *converting <= 1));

    let totals = converter.summary();
    assert_eq!((totals.succeeded, totals.failed, totals.converting), (3, 2, 0));
    assert_eq!(totals.progress, 100.0);
}

#[test]
fn progress_never_goes_backwards() {
    let mut converter = ready(BackendMode::Auto);
    let events = record(&converter);
    let ids = converter.enqueue([
        ("wall.ifc", WALL_IFC.as_bytes().to_vec()),
        ("broken.ifc", b"garbage".to_vec()),
    ]);
    converter.convert_all().unwrap();

    let mut per_job: HashMap<JobId, Vec<u8>> = HashMap::new();
    for (event, _) in events.lock().iter() {
        if let JobEvent::Progress { id, percent, .. } = event {
            per_job.entry(*id).or_default().push(*percent);
        }
    }

    for id in ids {
        let percents = &per_job[&id];
        assert!(percents.windows(2).all(|w| w[0] <= w[1]), "{percents:?}");
        assert!(percents.iter().all(|&p| p < 100));
        assert_eq!(percents[0], 5);
    }

    let wall = &per_job[&JobId(1)];
    assert!(wall.contains(&35));
    assert!(wall.contains(&75));
    assert_eq!(&wall[wall.len() - 2..], &[85, 95]);
    assert_eq!(converter.job(JobId(1)).unwrap().progress, 100);
    assert_eq!(converter.job(JobId(2)).unwrap().status, JobStatus::Failed);
}

#[test]
fn batch_progress_counts_terminal_jobs() {
    let mut converter = ready(BackendMode::Fallback);
    let events = record(&converter);
    converter.enqueue((0..4).map(|i| (format!("f{i}.ifc"), THREE_LINES.as_bytes().to_vec())));
    converter.convert_all().unwrap();

    let batch: Vec<(usize, f64)> = events
        .lock()
        .iter()
        .filter_map(|(event, _)| match event {
            JobEvent::BatchProgress {
                completed, percent, ..
            } => Some((*completed, *percent)),
            _ => None,
        })
        .collect();
    assert_eq!(
        batch,
        vec![(0, 0.0), (1, 25.0), (2, 50.0), (3, 75.0), (4, 100.0)]
    );
}

#[test]
fn empty_batch_is_complete() {
    let mut converter = ready(BackendMode::Fallback);
    let events = record(&converter);
    let summary = converter.convert_all().unwrap();
    assert_eq!(summary.total, 0);
    assert!(matches!(
        events.lock()[0].0,
        JobEvent::BatchProgress { percent, .. } if percent == 100.0
    ));
}

#[test]
fn material_names_match_geometry_types() {
    let mut converter = ready(BackendMode::Auto);
    let ids = converter.enqueue([
        ("wall.ifc", WALL_IFC.as_bytes().to_vec()),
    ]);
    converter.convert_all().unwrap();

    let artifact = converter.artifact(ids[0]).unwrap();
    let json = glb_json(&artifact.glb);
    let materials: BTreeSet<&str> = json["materials"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["name"].as_str().unwrap())
        .collect();
    let types: BTreeSet<&str> = json["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["extras"]["ifcType"].as_str().unwrap())
        .collect();
    assert_eq!(materials, types);
    assert_eq!(types, BTreeSet::from(["IfcWall", "IfcWindow"]));

    let wall = &json["nodes"][0];
    assert_eq!(wall["name"], "IfcWall_30");
    assert_eq!(wall["extras"]["expressID"], 30);
    assert_eq!(wall["matrix"][12], 1.0);
    assert_eq!(wall["matrix"][13], 2.0);
    assert_eq!(json["materials"][1]["alphaMode"], "BLEND");
}

#[test]
fn failed_initialization_blocks_conversion() {
    let mut converter = Converter::new(config(BackendMode::Native))
        .unwrap()
        .with_sources(vec![Arc::new(FailingSource) as Arc<dyn NativeSource>]);
    assert!(matches!(converter.initialize(), Err(Error::Initialization(_))));
    assert!(matches!(converter.readiness(), Readiness::Failed { .. }));

    let id = converter.enqueue([("a.ifc", THREE_LINES.as_bytes().to_vec())])[0];
    assert!(matches!(converter.convert_all(), Err(Error::Initialization(_))));
    assert!(matches!(converter.convert_single(id), Err(Error::Initialization(_))));
    assert_eq!(converter.job(id).unwrap().status, JobStatus::Pending);
}

#[test]
fn worker_panic_fails_the_job_and_the_batch_goes_on() {
    let mut converter = Converter::new(config(BackendMode::Auto))
        .unwrap()
        .with_sources(vec![Arc::new(ExplodingSource) as Arc<dyn NativeSource>]);
    converter.initialize().unwrap();

    let ids = converter.enqueue([
        ("boom.ifc", THREE_LINES.as_bytes().to_vec()),
        ("fine.ifc", THREE_LINES.as_bytes().to_vec()),
    ]);
    converter.convert_all().unwrap();

    let boom = converter.job(ids[0]).unwrap();
    assert_eq!(boom.status, JobStatus::Failed);
    assert_eq!(
        boom.error.as_deref(),
        Some("Parse worker fault: attempt to subtract with overflow")
    );
    assert_eq!(converter.job(ids[1]).unwrap().status, JobStatus::Success);
}

#[test]
fn removing_jobs() {
    let mut converter = ready(BackendMode::Fallback);
    let ids = converter.enqueue([
        ("a.ifc", THREE_LINES.as_bytes().to_vec()),
        ("b.ifc", THREE_LINES.as_bytes().to_vec()),
    ]);
    let removed = converter.remove(ids[0]).unwrap();
    assert_eq!(removed.name, "a.ifc");
    assert!(matches!(converter.remove(ids[0]), Err(Error::JobNotFound(_))));

    let summary = converter.convert_all().unwrap();
    assert_eq!(summary.total, 1);
    assert_eq!(converter.jobs().len(), 1);
}

#[test]
fn observers_in_callbacks_only_read() {
    let mut converter = ready(BackendMode::Fallback);
    let ids = converter.enqueue([
        ("a.ifc", THREE_LINES.as_bytes().to_vec()),
        ("b.ifc", THREE_LINES.as_bytes().to_vec()),
        ("c.ifc", THREE_LINES.as_bytes().to_vec()),
    ]);

    let observer = converter.observer();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    converter.subscribe(move |event| {
        if let JobEvent::StatusChanged {
            status: JobStatus::Success,
            ..
        } = event
        {
            sink.lock().push((observer.len(), observer.summary().succeeded));
        }
    });

    let summary = converter.convert_all().unwrap();
    assert_eq!((summary.total, summary.succeeded), (3, 3));
    assert_eq!(*seen.lock(), vec![(3, 1), (3, 2), (3, 3)]);
    for id in ids {
        assert_eq!(converter.job(id).unwrap().status, JobStatus::Success);
    }
    assert_eq!(converter.observer().summary().progress, 100.0);
}
