// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use clap::Parser as _;
use ifc_glb_cli::{run, Args};
use ifc_glb_convert::{BackendMode, Readiness};
use pretty_assertions::assert_eq;
use std::path::Path;

const SLAB_IFC: &str = r#"ISO-10303-21;
HEADER;
FILE_DESCRIPTION((''),'2;1');
FILE_NAME('slab.ifc','',(''),(''),'','','');
FILE_SCHEMA(('IFC4'));
ENDSEC;
DATA;
#1=IFCPROJECT('0aB7rqQ4n0WOxTHa0iyO8g',$,'Slab',$,$,$,$,$,#2);
#2=IFCUNITASSIGNMENT((#3));
#3=IFCSIUNIT(*,.LENGTHUNIT.,$,.METRE.);
#10=IFCCARTESIANPOINT((0.,0.,0.));
#11=IFCAXIS2PLACEMENT3D(#10,$,$);
#14=IFCLOCALPLACEMENT($,#11);
#16=IFCDIRECTION((0.,0.,1.));
#20=IFCRECTANGLEPROFILEDEF(.AREA.,$,$,5.,5.);
#21=IFCEXTRUDEDAREASOLID(#20,#11,#16,0.3);
#22=IFCSHAPEREPRESENTATION($,'Body','SweptSolid',(#21));
#23=IFCPRODUCTDEFINITIONSHAPE($,$,(#22));
#30=IFCSLAB('2hQBAVPOr5VxhS3Jl0O47h',$,'Slab',$,$,#14,#23,$,$);
ENDSEC;
END-ISO-10303-21;
"#;

fn args(dir: &Path, extra: &[&str], inputs: &[&str]) -> Args {
    let out = dir.join("out");
    let mut argv = vec![
        "ifc2glb".to_string(),
        "--out-dir".to_string(),
        out.display().to_string(),
    ];
    argv.extend(extra.iter().map(|s| s.to_string()));
    argv.extend(inputs.iter().map(|name| dir.join(name).display().to_string()));
    Args::try_parse_from(argv).unwrap()
}

fn is_glb(path: &Path) -> bool {
    let bytes = std::fs::read(path).unwrap();
    bytes.len() >= 12 && &bytes[0..4] == b"glTF"
}

#[test]
fn native_batch_writes_one_glb_per_success() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("slab.ifc"), SLAB_IFC).unwrap();
    std::fs::write(dir.path().join("notes.ifc"), "just some notes").unwrap();

    let mut stdout = Vec::new();
    let report = run(
        &args(dir.path(), &["--backend", "native"], &["slab.ifc", "notes.ifc"]),
        &mut stdout,
    )
    .unwrap();

    assert!(matches!(report.readiness, Readiness::Native { .. }));
    assert_eq!(report.summary.total, 2);
    assert_eq!(report.summary.succeeded, 1);
    assert_eq!(report.summary.failed, 1);
    assert!(!report.all_succeeded());

    let slab = dir.path().join("out").join("slab.glb");
    assert_eq!(report.written, vec![slab.clone()]);
    assert!(is_glb(&slab));
    assert!(!dir.path().join("out").join("notes.glb").exists());

    let stdout = String::from_utf8(stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("ok      slab.ifc -> "));
    assert!(lines[1].starts_with("failed  notes.ifc: "));
    assert!(lines[2].starts_with("1 of 2 converted in "));
}

#[test]
fn fallback_flag_converts_loose_declarations() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("sketch.ifc"), "#1=IFCWALL('a');\n#2=IFCDOOR('b');\n").unwrap();

    let mut stdout = Vec::new();
    let report = run(
        &args(dir.path(), &["--backend", "fallback"], &["sketch.ifc"]),
        &mut stdout,
    )
    .unwrap();

    assert!(matches!(report.readiness, Readiness::Fallback { .. }));
    assert!(report.all_succeeded());
    assert!(is_glb(&dir.path().join("out").join("sketch.glb")));
}

#[test]
fn config_file_is_applied_and_flags_win() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("convert.json");
    std::fs::write(&config, r#"{ "backend": "native", "fallback_seed": 3 }"#).unwrap();
    std::fs::write(dir.path().join("sketch.ifc"), "#1=IFCWALL('a');\n").unwrap();

    let parsed = args(
        dir.path(),
        &["--config", config.to_str().unwrap(), "--backend", "fallback"],
        &["sketch.ifc"],
    );
    let loaded = ifc_glb_cli::load_config(&parsed).unwrap();
    assert_eq!(loaded.backend, BackendMode::Fallback);
    assert_eq!(loaded.fallback_seed, Some(3));

    let report = run(&parsed, &mut Vec::new()).unwrap();
    assert!(report.all_succeeded());
}

#[test]
fn invalid_config_stops_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("convert.json");
    std::fs::write(&config, r#"{ "init_timeout_ms": 0 }"#).unwrap();
    std::fs::write(dir.path().join("slab.ifc"), SLAB_IFC).unwrap();

    let parsed = args(dir.path(), &["--config", config.to_str().unwrap()], &["slab.ifc"]);
    let err = run(&parsed, &mut Vec::new()).unwrap_err();
    assert!(format!("{err:#}").contains("timeouts must be greater than zero"));
    assert!(!dir.path().join("out").exists());
}

#[test]
fn missing_input_stops_the_run() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("slab.ifc"), SLAB_IFC).unwrap();

    let mut stdout = Vec::new();
    let err = run(&args(dir.path(), &[], &["slab.ifc", "absent.ifc"]), &mut stdout).unwrap_err();
    assert!(err.to_string().contains("absent.ifc"));
    assert!(stdout.is_empty());
    assert!(!dir.path().join("out").exists());
}
