#![no_main]

use libfuzzer_sys::fuzz_target;

use somqc_core::table::{RawCell, RawTable};
use somqc_core::{QualityGrader, SheetTransform};

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }
    // First two bytes pick the shape, capped small for speed
    let rows = usize::from(data[0] % 16);
    let cols = usize::from(data[1] % 8);
    let mut bytes = data[2..].iter().copied();

    let cells: Vec<Vec<RawCell>> = (0..rows)
        .map(|_| {
            (0..cols)
                .map(|_| match bytes.next() {
                    None | Some(0) => RawCell::Missing,
                    Some(1) => RawCell::Text("n/a".into()),
                    Some(2) => RawCell::Number(-3.5),
                    Some(b) => RawCell::Number(f64::from(b - 3)),
                })
                .collect()
        })
        .collect();
    let table = RawTable::new(
        (1..=rows).map(|i| format!("N{i}")).collect(),
        (1..=cols).map(|j| format!("C{j}")).collect(),
        cells,
    );

    // Should not panic
    if let Ok(result) = SheetTransform::default().transform("fuzz", &table) {
        assert_eq!(result.confusion_matrix.total(), result.total_observations);
        assert!((0.0..=100.0).contains(&result.accuracy));
        let _ = QualityGrader::new().assess(result);
    }
});
