// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Whole-document parsing against an inline fixture with one of each
//! supported entity kind.

use dxf_lite_geometry::Entity;
use dxf_lite_parser::{parse_str, DxfVersion};

const FIXTURE: &str = "\
0
SECTION
2
HEADER
9
$ACADVER
1
AC1015
0
ENDSEC
0
SECTION
2
TABLES
0
LAYER
2
walls
0
ENDSEC
0
SECTION
2
ENTITIES
0
LINE
8
walls
10
0
20
0
30
0
11
10
21
0
31
0
0
LWPOLYLINE
8
floor
90
3
70
1
38
1.5
10
0
20
0
10
5
20
0
10
5
20
5
0
ARC
8
curves
10
0
20
0
30
0
40
3
50
0
51
180
0
CIRCLE
8
curves
10
1
20
1
30
0
40
2
0
ELLIPSE
8
curves
10
0
20
0
30
0
11
4
21
0
31
0
40
0.5
0
SPLINE
8
curves
71
3
73
4
10
0
20
0
30
0
10
1
20
2
30
0
10
3
20
2
30
0
10
4
20
0
30
0
0
3DFACE
8
surfaces
10
0
20
0
30
0
11
1
21
0
31
0
12
1
22
1
32
0
13
1
23
1
33
0
0
POLYLINE
8
pipes
70
8
0
VERTEX
8
pipes
10
0
20
0
30
0
0
VERTEX
8
pipes
10
1
20
1
30
1
0
SEQEND
0
MTEXT
8
notes
1
ignored
0
ENDSEC
0
EOF
";

#[test]
fn fixture_decodes_one_of_each_entity() {
    let document = parse_str(FIXTURE).unwrap();
    assert_eq!(document.version, Some(DxfVersion::R2000));
    assert_eq!(document.entities.len(), 8);
    assert_eq!(document.skipped.get("MTEXT"), Some(&1));

    let kinds: Vec<&str> = document.entities.iter().map(|e| e.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            "Line",
            "LwPolyline",
            "Arc",
            "Circle",
            "Ellipse",
            "Spline",
            "3DFace",
            "Polyline"
        ]
    );
}

#[test]
fn fixture_attribute_spot_checks() {
    let document = parse_str(FIXTURE).unwrap();

    match &document.entities[1] {
        Entity::LwPolyline {
            points,
            elevation,
            is_closed,
            ..
        } => {
            assert_eq!(points.len(), 3);
            assert_eq!(*elevation, 1.5);
            assert!(*is_closed);
        }
        other => panic!("unexpected {other:?}"),
    }

    match &document.entities[4] {
        Entity::Ellipse {
            major_axis,
            minor_ratio,
            ..
        } => {
            assert_eq!(major_axis.x, 4.0);
            assert_eq!(*minor_ratio, 0.5);
        }
        other => panic!("unexpected {other:?}"),
    }

    match &document.entities[5] {
        Entity::Spline {
            degree,
            control_points,
            ..
        } => {
            assert_eq!(*degree, 3);
            assert_eq!(control_points.len(), 4);
        }
        other => panic!("unexpected {other:?}"),
    }

    match &document.entities[6] {
        Entity::Face3D { corners, .. } => {
            // The triangle repeats its fourth corner; the parser hands all
            // four through and the preprocessor deduplicates.
            assert_eq!(corners.len(), 4);
            assert_eq!(corners[2], corners[3]);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn layers_are_carried_on_every_entity() {
    let document = parse_str(FIXTURE).unwrap();
    let layers: Vec<&str> = document.entities.iter().map(|e| e.layer()).collect();
    assert_eq!(
        layers,
        vec!["walls", "floor", "curves", "curves", "curves", "curves", "surfaces", "pipes"]
    );
}
