// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use approx::assert_relative_eq;
use ifc_glb_model::{EntityId, EntityResolver, IfcType};
use ifc_glb_parser::{parse, EntityScanner};

const HOUSE_IFC: &str = r#"ISO-10303-21;
HEADER;
FILE_DESCRIPTION(('ViewDefinition [ReferenceView]'),'2;1');
FILE_NAME('house.ifc','2024-05-01T10:00:00',('Architect'),('Office'),'Exporter 1.0','Modeller 24','');
FILE_SCHEMA(('IFC4'));
ENDSEC;
DATA;
#1=IFCPROJECT('0YvctVUKr0kugbFTf53O9L',$,'House',$,$,$,$,(#20),#2);
#2=IFCUNITASSIGNMENT((#3,#4));
#3=IFCSIUNIT(*,.LENGTHUNIT.,.CENTI.,.METRE.);
#4=IFCSIUNIT(*,.PLANEANGLEUNIT.,$,.RADIAN.);
#20=IFCGEOMETRICREPRESENTATIONCONTEXT($,'Model',3,1.E-05,#21,$);
#21=IFCAXIS2PLACEMENT3D(#22,$,$);
#22=IFCCARTESIANPOINT((0.,0.,0.));
/* walls */
#30=IFCWALL('2O2Fr$t4X7Zf8NOew3FLOH',$,'Wall ''North''',$,$,#31,$,$,$);
#31=IFCLOCALPLACEMENT($,#21);
#40=IFCWINDOW('1kTvXnbbzCWw8lcMd1dR4o',$,'Window',$,$,#31,$,$,1.2,1.,$,$,$);
ENDSEC;
END-ISO-10303-21;
"#;

#[test]
fn opens_a_small_house() {
    let model = parse(HOUSE_IFC.as_bytes()).unwrap();

    assert_eq!(model.metadata().schema_version, "IFC4");
    assert_eq!(
        model.metadata().originating_system.as_deref(),
        Some("Modeller 24")
    );
    assert_relative_eq!(model.unit_scale(), 0.01);
    assert_eq!(model.entity_count(), 10);

    let resolver = model.resolver();
    let walls = resolver.ids_by_type(&IfcType::IfcWall);
    assert_eq!(walls, vec![EntityId(30)]);

    let wall = resolver.get(walls[0]).unwrap();
    assert_eq!(wall.get_string(2), Some("Wall 'North'"));

    let placement = resolver.resolve_ref(wall.get(5).unwrap()).unwrap();
    assert_eq!(placement.ifc_type, IfcType::IfcLocalPlacement);
}

#[test]
fn scanner_and_resolver_agree_on_counts() {
    let model = parse(HOUSE_IFC.as_bytes()).unwrap();
    let counts = EntityScanner::count_by_type(HOUSE_IFC);

    assert_eq!(counts.values().sum::<usize>(), model.entity_count());
    assert_eq!(
        counts.get("IFCWINDOW").copied(),
        Some(model.resolver().count_by_type(&IfcType::IfcWindow))
    );
}

#[test]
fn garbage_is_not_a_model() {
    assert!(parse(b"just some text").is_err());
    assert!(parse("#1=IFCWALL('a');\n".as_bytes()).is_err());
}
