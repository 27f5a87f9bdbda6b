//! Curve core debug driver: builds a few sample curves and prints query
//! results.
//!
//! Usage:
//! ```text
//! cargo run --example debug                   # all patterns
//! cargo run --example debug -- intersections  # one pattern
//! RUST_LOG=curve_core=debug cargo run --example debug
//! ```

use std::f64::consts::FRAC_PI_2;

use curve_core::geometry::{
    Arc3d, BezierCurve3d, Curve, CurveChainWithDistanceIndex, CurveExtend, CurvePrimitive,
    LineSegment3d, Plane, TransitionSpiral3d,
};
use curve_core::math::{AngleSweep, Point3, Vector3};
use curve_core::operations::query::{
    ClosestPointOnCurve, CurveCurveIntersect, CurvePlaneIntersect, Length,
};
use curve_core::tessellation::{StrokeOptions, TessellateCurve};

type Pattern = fn() -> curve_core::Result<()>;

const PATTERNS: &[(&str, Pattern)] = &[
    ("lengths", lengths),
    ("chain", chain),
    ("intersections", intersections),
    ("tessellation", tessellation),
];

fn hook() -> curve_core::Result<CurveChainWithDistanceIndex> {
    CurveChainWithDistanceIndex::create(
        vec![
            LineSegment3d::new(Point3::origin(), Point3::new(4.0, 0.0, 0.0)).into(),
            Arc3d::circular_arc(
                Point3::new(4.0, 2.0, 0.0),
                2.0,
                Vector3::z(),
                Vector3::new(0.0, -1.0, 0.0),
                AngleSweep::new(0.0, FRAC_PI_2),
            )?
            .into(),
        ],
        None,
    )
}

fn lengths() -> curve_core::Result<()> {
    let curves: Vec<(&str, Curve)> = vec![
        (
            "segment",
            LineSegment3d::new(Point3::origin(), Point3::new(3.0, 4.0, 0.0)).into(),
        ),
        ("circle", Arc3d::circle(Point3::origin(), 1.0, Vector3::z())?.into()),
        (
            "spiral",
            TransitionSpiral3d::new(Point3::origin(), Vector3::z(), 0.0, 0.0, 0.01, 100.0)?.into(),
        ),
        (
            "bezier",
            BezierCurve3d::new(vec![
                Point3::origin(),
                Point3::new(1.0, 2.0, 0.0),
                Point3::new(3.0, 2.0, 0.0),
                Point3::new(4.0, 0.0, 0.0),
            ])?
            .into(),
        ),
    ];
    for (name, curve) in &curves {
        println!(
            "{name:>8}: length {:.9}  quick {:.9}",
            Length::new(curve).execute(),
            curve.quick_length()
        );
    }
    Ok(())
}

fn chain() -> curve_core::Result<()> {
    let chain = hook()?;
    println!("chain length {:.9}", chain.total_length());
    for fragment in chain.fragments() {
        println!(
            "  fragment [{:.4}, {:.4}] on child -> distance [{:.4}, {:.4}]",
            fragment.child_fraction0,
            fragment.child_fraction1,
            fragment.chain_distance0,
            fragment.chain_distance1
        );
    }
    let walked = chain.move_signed_distance_from_fraction(0.0, 5.0, false);
    println!("walked 5.0 from start: fraction {:.9} at {:?}", walked.fraction, walked.point);
    if let Some(detail) = ClosestPointOnCurve::new(&chain, Point3::new(7.0, 1.0, 0.0))
        .with_extend(CurveExtend::NONE)
        .execute()
    {
        println!("closest to (7, 1, 0): fraction {:.9} distance {:.9}", detail.fraction, detail.a);
    }
    Ok(())
}

fn intersections() -> curve_core::Result<()> {
    let circle: Curve = Arc3d::circle(Point3::origin(), 1.0, Vector3::z())?.into();
    let plane = Plane::from_normal(Point3::new(0.5, 0.0, 0.0), Vector3::x())?;
    for detail in CurvePlaneIntersect::new(&circle, plane).execute() {
        println!("circle x plane: fraction {:.9} at {:?}", detail.fraction, detail.point);
    }

    let other: Curve = Arc3d::circle(Point3::new(1.0, 0.5, 0.0), 1.0, Vector3::z())?.into();
    let chain: Curve = hook()?.into();
    let pairs: [(&str, &Curve, &Curve); 2] = [("circle x circle", &circle, &other), ("chain x circle", &chain, &other)];
    for (name, a, b) in pairs {
        let result = CurveCurveIntersect::new(a, b).execute();
        for (on_a, on_b) in result.iter() {
            println!("{name}: {:.9} / {:.9} at {:?}", on_a.fraction, on_b.fraction, on_a.point);
        }
    }
    Ok(())
}

fn tessellation() -> curve_core::Result<()> {
    let chain = hook()?;
    let options = StrokeOptions::new(Some(0.01), None, Some(1.0), None)?;
    let polyline = TessellateCurve::new(&chain, options).execute()?;
    println!("chain strokes into {} points", polyline.len());
    for (point, fraction) in polyline.points.iter().zip(&polyline.fractions) {
        println!("  {fraction:.6}  ({:.4}, {:.4}, {:.4})", point.x, point.y, point.z);
    }
    Ok(())
}

fn main() -> curve_core::Result<()> {
    // Default: WARN for everything. Override with RUST_LOG.
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let selected = std::env::args().nth(1);
    for (name, pattern) in PATTERNS {
        if selected.as_deref().is_none_or(|s| s == *name) {
            println!("== {name}");
            pattern()?;
        }
    }
    Ok(())
}
