// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use approx::assert_relative_eq;
use ifc_glb_geometry::{Error, GeometryRouter, Mesh, Point3};
use ifc_glb_model::{EntityId, EntityResolver};
use ifc_glb_parser::parse;

const MODEL: &str = r#"ISO-10303-21;
HEADER;
FILE_DESCRIPTION((''),'2;1');
FILE_NAME('geometry.ifc','2024-01-01T00:00:00',(''),(''),'','','');
FILE_SCHEMA(('IFC4'));
ENDSEC;
DATA;
#1=IFCPROJECT('3MD_HkJ6X2EwpfIbCFm0g_',$,'Geometry',$,$,$,$,$,#2);
#2=IFCUNITASSIGNMENT((#3));
#3=IFCSIUNIT(*,.LENGTHUNIT.,.MILLI.,.METRE.);
#10=IFCCARTESIANPOINT((0.,0.,0.));
#11=IFCAXIS2PLACEMENT3D(#10,$,$);
#12=IFCCARTESIANPOINT((1000.,0.,0.));
#13=IFCAXIS2PLACEMENT3D(#12,$,$);
#14=IFCLOCALPLACEMENT($,#11);
#15=IFCLOCALPLACEMENT(#14,#13);
#16=IFCDIRECTION((0.,0.,1.));
/* wall body: 4000 x 200 x 3000 */
#20=IFCWALL('1bYqDcL7XAHuWTwYs1LPuv',$,'Wall',$,$,#15,#21,$,$);
#21=IFCPRODUCTDEFINITIONSHAPE($,$,(#22,#26));
#22=IFCSHAPEREPRESENTATION($,'Body','SweptSolid',(#23));
#23=IFCEXTRUDEDAREASOLID(#24,#11,#16,3000.);
#24=IFCRECTANGLEPROFILEDEF(.AREA.,$,$,4000.,200.);
#26=IFCSHAPEREPRESENTATION($,'Axis','Curve2D',(#27));
#27=IFCPOLYLINE((#10,#12));
/* two instances of one mapped triangle */
#30=IFCBUILDINGELEMENTPROXY('0dJ1eSAxH3sBn6ipvCz1Xq',$,'Proxy',$,$,$,#31,$,$);
#31=IFCPRODUCTDEFINITIONSHAPE($,$,(#32));
#32=IFCSHAPEREPRESENTATION($,'Body','MappedRepresentation',(#33,#34));
#33=IFCMAPPEDITEM(#35,#38);
#34=IFCMAPPEDITEM(#35,#39);
#35=IFCREPRESENTATIONMAP(#11,#36);
#36=IFCSHAPEREPRESENTATION($,'Body','Tessellation',(#37));
#37=IFCTRIANGULATEDFACESET(#40,$,.T.,((1,2,3)),$);
#38=IFCCARTESIANTRANSFORMATIONOPERATOR3D($,$,#10,$,$);
#39=IFCCARTESIANTRANSFORMATIONOPERATOR3D($,$,#41,$,$);
#40=IFCCARTESIANPOINTLIST3D(((0.,0.,0.),(1000.,0.,0.),(0.,1000.,0.)));
#41=IFCCARTESIANPOINT((5000.,0.,0.));
/* body that cannot be built */
#50=IFCCOLUMN('2EiKj3xMX0BOg5k7uS4K3y',$,'Column',$,$,$,#51,$,$);
#51=IFCPRODUCTDEFINITIONSHAPE($,$,(#52));
#52=IFCSHAPEREPRESENTATION($,'Body','SweptSolid',(#53));
#53=IFCEXTRUDEDAREASOLID(#99,#11,#16,3000.);
ENDSEC;
END-ISO-10303-21;
"#;

fn bounds(mesh: &Mesh) -> (Point3<f32>, Point3<f32>) {
    let mut min = Point3::new(f32::MAX, f32::MAX, f32::MAX);
    let mut max = Point3::new(f32::MIN, f32::MIN, f32::MIN);
    for p in mesh.positions.chunks_exact(3) {
        for axis in 0..3 {
            min[axis] = min[axis].min(p[axis]);
            max[axis] = max[axis].max(p[axis]);
        }
    }
    (min, max)
}

#[test]
fn wall_body_is_built_in_metres() {
    let model = parse(MODEL.as_bytes()).unwrap();
    assert_relative_eq!(model.unit_scale(), 0.001);

    let router = GeometryRouter::with_default_processors_and_unit_scale(model.unit_scale());
    let resolver = model.resolver();
    let wall = resolver.get(EntityId(20)).unwrap();

    let mesh = router.process_element(&wall, resolver).unwrap();
    // the axis representation is ignored
    assert_eq!(mesh.triangle_count(), 12);

    let (min, max) = bounds(&mesh);
    assert_relative_eq!(min, Point3::new(-2.0, -0.1, 0.0), epsilon = 1e-5);
    assert_relative_eq!(max, Point3::new(2.0, 0.1, 3.0), epsilon = 1e-5);

    let transform = router.element_transform(&wall, resolver).unwrap();
    assert_relative_eq!(transform[(0, 3)], 1.0, epsilon = 1e-12);
    assert_relative_eq!(transform[(0, 0)], 1.0, epsilon = 1e-12);
}

#[test]
fn mapped_items_are_instanced() {
    let model = parse(MODEL.as_bytes()).unwrap();
    let router = GeometryRouter::with_default_processors_and_unit_scale(model.unit_scale());
    let resolver = model.resolver();
    let proxy = resolver.get(EntityId(30)).unwrap();

    let mesh = router.process_element(&proxy, resolver).unwrap();
    assert_eq!(mesh.vertex_count(), 6);
    assert_eq!(mesh.indices, vec![0, 1, 2, 3, 4, 5]);

    let (min, max) = bounds(&mesh);
    assert_relative_eq!(min.x, 0.0, epsilon = 1e-5);
    assert_relative_eq!(max.x, 6.0, epsilon = 1e-5);

    // no placement means the origin
    let transform = router.element_transform(&proxy, resolver).unwrap();
    assert_eq!(transform, ifc_glb_geometry::Matrix4::identity());
}

#[test]
fn failing_body_reports_the_first_error() {
    let model = parse(MODEL.as_bytes()).unwrap();
    let router = GeometryRouter::with_default_processors();
    let resolver = model.resolver();
    let column = resolver.get(EntityId(50)).unwrap();

    assert!(matches!(
        router.process_element(&column, resolver),
        Err(Error::EntityNotFound(EntityId(99)))
    ));
}
