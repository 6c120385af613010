// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end kernel checks on small in-memory models: unit scaling,
//! placement chains, mapped items and tessellated bodies.

use approx::assert_relative_eq;
use column_qa_core::IfcModel;
use column_qa_geometry::{GeometryKernel, GeometryRouter, Mesh};

fn model(data: &str) -> IfcModel {
    let content = format!(
        "ISO-10303-21;\nHEADER;\nFILE_SCHEMA(('IFC4'));\nENDSEC;\nDATA;\n{}\nENDSEC;\nEND-ISO-10303-21;\n",
        data
    );
    IfcModel::from_content("kernel.ifc", content).unwrap()
}

fn shape(model: &IfcModel, id: u32) -> Mesh {
    let router = GeometryRouter::for_model(model);
    let mut decoder = model.decoder();
    let element = decoder.decode_by_id(id).unwrap();
    router.create_shape(&element, &mut decoder).unwrap()
}

const UNITS_MM: &str = "
#900=IFCSIUNIT(*,.LENGTHUNIT.,.MILLI.,.METRE.);
#901=IFCUNITASSIGNMENT((#900));";

#[test]
fn test_millimetre_column_on_storey_in_metres() {
    let data = format!(
        "{}
#1=IFCCARTESIANPOINT((0.,0.,0.));
#2=IFCAXIS2PLACEMENT3D(#1,$,$);
#3=IFCLOCALPLACEMENT($,#2);
#4=IFCCARTESIANPOINT((0.,0.,4000.));
#5=IFCAXIS2PLACEMENT3D(#4,$,$);
#6=IFCLOCALPLACEMENT(#3,#5);
#7=IFCCARTESIANPOINT((6000.,3000.,0.));
#8=IFCAXIS2PLACEMENT3D(#7,$,$);
#9=IFCLOCALPLACEMENT(#6,#8);
#10=IFCRECTANGLEPROFILEDEF(.AREA.,$,$,400.,600.);
#11=IFCDIRECTION((0.,0.,1.));
#12=IFCEXTRUDEDAREASOLID(#10,#2,#11,3200.);
#13=IFCSHAPEREPRESENTATION($,'Body','SweptSolid',(#12));
#14=IFCPRODUCTDEFINITIONSHAPE($,$,(#13));
#15=IFCCOLUMN('2O2Fr$t4X7Zf8NOew3FLOH',$,$,$,$,#9,#14,$,.COLUMN.);",
        UNITS_MM
    );
    let model = model(&data);
    let mesh = shape(&model, 15);
    let (min, max) = mesh.bounds().unwrap();

    assert_relative_eq!(min.x, 5.8, epsilon = 1e-9);
    assert_relative_eq!(max.x, 6.2, epsilon = 1e-9);
    assert_relative_eq!(min.y, 2.7, epsilon = 1e-9);
    assert_relative_eq!(max.y, 3.3, epsilon = 1e-9);
    assert_relative_eq!(min.z, 4.0, epsilon = 1e-9);
    assert_relative_eq!(max.z, 7.2, epsilon = 1e-9);
}

#[test]
fn test_mapped_item_with_target_operator() {
    let data = format!(
        "{}
#1=IFCCARTESIANPOINT((0.,0.,0.));
#2=IFCAXIS2PLACEMENT3D(#1,$,$);
#3=IFCCIRCLEPROFILEDEF(.AREA.,$,$,250.);
#4=IFCDIRECTION((0.,0.,1.));
#5=IFCEXTRUDEDAREASOLID(#3,#2,#4,3000.);
#6=IFCSHAPEREPRESENTATION($,'Body','SweptSolid',(#5));
#7=IFCREPRESENTATIONMAP(#2,#6);
#8=IFCCARTESIANPOINT((1000.,0.,500.));
#9=IFCCARTESIANTRANSFORMATIONOPERATOR3D($,$,#8,1.,$);
#10=IFCMAPPEDITEM(#7,#9);
#11=IFCSHAPEREPRESENTATION($,'Body','MappedRepresentation',(#10));
#12=IFCPRODUCTDEFINITIONSHAPE($,$,(#11));
#13=IFCCOLUMN('1kTvXnbbzCWw8lcMd1dR4o',$,$,$,$,$,#12,$,$);",
        UNITS_MM
    );
    let model = model(&data);
    let (min, max) = shape(&model, 13).bounds().unwrap();

    assert_relative_eq!(min.x, 0.75, epsilon = 1e-9);
    assert_relative_eq!(max.x, 1.25, epsilon = 1e-9);
    assert_relative_eq!(min.z, 0.5, epsilon = 1e-9);
    assert_relative_eq!(max.z, 3.5, epsilon = 1e-9);
}

#[test]
fn test_triangulated_column_in_metres() {
    let data = "
#1=IFCSIUNIT(*,.LENGTHUNIT.,$,.METRE.);
#2=IFCUNITASSIGNMENT((#1));
#3=IFCCARTESIANPOINTLIST3D(((0.,0.,0.),(0.3,0.,0.),(0.3,0.3,0.),(0.,0.3,0.),(0.,0.,2.5),(0.3,0.,2.5),(0.3,0.3,2.5),(0.,0.3,2.5)));
#4=IFCTRIANGULATEDFACESET(#3,$,.T.,((1,2,3),(1,3,4),(5,6,7),(5,7,8),(1,2,6),(1,6,5)),$);
#5=IFCSHAPEREPRESENTATION($,'Body','Tessellation',(#4));
#6=IFCPRODUCTDEFINITIONSHAPE($,$,(#5));
#7=IFCCOLUMN('0cB2t1Mr1F$Ogd3Yx0bNzv',$,$,$,$,$,#6,$,$);";
    let model = model(data);
    let router = GeometryRouter::for_model(&model);
    assert_eq!(router.unit_scale(), 1.0);

    let (min, max) = shape(&model, 7).bounds().unwrap();
    assert_relative_eq!(max.x - min.x, 0.3, epsilon = 1e-12);
    assert_relative_eq!(max.z, 2.5, epsilon = 1e-12);
}

#[test]
fn test_element_without_body_fails() {
    let data = format!(
        "{}
#1=IFCCOLUMN('3vB2YO$MX4xv5uCqZZG05x',$,$,$,$,$,$,$,$);",
        UNITS_MM
    );
    let model = model(&data);
    let router = GeometryRouter::for_model(&model);
    let mut decoder = model.decoder();
    let element = decoder.decode_by_id(1).unwrap();
    assert!(router.create_shape(&element, &mut decoder).is_err());
}
