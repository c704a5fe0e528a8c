//! Recomputation after edits, iteration hooks and dependency listeners

use gridcalc::prelude::*;
use pretty_assertions::assert_eq;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

fn set(engine: &mut Engine, reference: &str, content: &str) {
    let position = engine.position(reference).unwrap();
    engine.set_cell_content(position, content).unwrap();
}

fn value(engine: &mut Engine, reference: &str) -> CellValue {
    let position = engine.position(reference).unwrap();
    engine.get_evaluated_cell(position).value
}

#[test]
fn test_edits_reach_transitive_dependents() {
    let mut engine = Engine::default();
    set(&mut engine, "A1", "1");
    set(&mut engine, "A2", "=A1*10");
    set(&mut engine, "A3", "=SUM(A1:A2)");
    set(&mut engine, "B1", "=A3&\"!\"");
    assert_eq!(value(&mut engine, "B1"), CellValue::string("11!"));

    set(&mut engine, "A1", "2");
    assert_eq!(value(&mut engine, "A3"), CellValue::Number(22.0));
    assert_eq!(value(&mut engine, "B1"), CellValue::string("22!"));
}

#[test]
fn test_unbounded_ranges_see_new_content() {
    let mut engine = Engine::default();
    set(&mut engine, "A1", "1");
    set(&mut engine, "B1", "=SUM(A:A)");
    assert_eq!(value(&mut engine, "B1"), CellValue::Number(1.0));

    set(&mut engine, "A99", "41");
    assert_eq!(value(&mut engine, "B1"), CellValue::Number(42.0));

    // beyond the sheet: the sheet grows and the column still covers it
    set(&mut engine, "A500", "100");
    assert_eq!(value(&mut engine, "B1"), CellValue::Number(142.0));
}

#[test]
fn test_reading_twice_is_identical() {
    let mut engine = Engine::default();
    set(&mut engine, "A1", "0.1");
    set(&mut engine, "A2", "=A1*3");
    set(&mut engine, "A3", "=DATE(2024, 2, 29)");
    let a2 = engine.position("A2").unwrap();
    let a3 = engine.position("A3").unwrap();

    let first = (engine.get_evaluated_cell(a2), engine.get_evaluated_cell(a3));
    let second = (engine.get_evaluated_cell(a2), engine.get_evaluated_cell(a3));
    assert_eq!(first, second);

    engine.evaluate_all();
    let third = (engine.get_evaluated_cell(a2), engine.get_evaluated_cell(a3));
    assert_eq!(first, third);
}

#[test]
fn test_replacing_a_formula_drops_old_dependencies() {
    let mut engine = Engine::default();
    set(&mut engine, "A1", "1");
    set(&mut engine, "B1", "2");
    set(&mut engine, "C1", "=A1");
    assert_eq!(value(&mut engine, "C1"), CellValue::Number(1.0));

    set(&mut engine, "C1", "=B1");
    let c1 = engine.position("C1").unwrap();
    assert_eq!(engine.dependencies(c1).len(), 1);
    assert_eq!(engine.dependencies(c1)[0].zone, Zone::parse("B1").unwrap());

    set(&mut engine, "B1", "5");
    assert_eq!(value(&mut engine, "C1"), CellValue::Number(5.0));

    set(&mut engine, "C1", "plain");
    assert!(engine.dependencies(c1).is_empty());
    assert_eq!(value(&mut engine, "C1"), CellValue::string("plain"));
}

#[test]
fn test_volatile_cells_are_recomputed_after_any_edit() {
    let mut engine = Engine::default();
    set(&mut engine, "A1", "=RAND()");
    set(&mut engine, "B1", "=A1*0+1");
    assert_eq!(value(&mut engine, "B1"), CellValue::Number(1.0));

    let summary = engine.evaluate_all();
    assert_eq!(summary.volatile_cells, 1);

    set(&mut engine, "Z9", "unrelated");
    match value(&mut engine, "A1") {
        CellValue::Number(n) => assert!((0.0..1.0).contains(&n)),
        other => panic!("RAND returned {other:?}"),
    }
    assert_eq!(value(&mut engine, "B1"), CellValue::Number(1.0));
}

#[test]
fn test_evaluate_all_summary() {
    let mut engine = Engine::default();
    set(&mut engine, "A1", "1");
    set(&mut engine, "A2", "=A1+1");
    set(&mut engine, "A3", "=A3");
    set(&mut engine, "A4", "text");

    let summary = engine.evaluate_all();
    assert_eq!(
        summary,
        EvaluationSummary {
            formula_count: 2,
            volatile_cells: 0,
            passes: 1,
            cells_computed: 4,
            errors: 1,
            circular_references: 1,
        }
    );
}

#[test]
fn test_iteration_hooks_request_more_passes() {
    let mut engine = Engine::default();
    set(&mut engine, "A1", "=1+1");

    let seen = Rc::new(RefCell::new(Vec::new()));
    let recorded = Rc::clone(&seen);
    engine.on_iteration_end(move |report| {
        recorded.borrow_mut().push(report.pass);
        if report.pass < 3 {
            IterationRequest::Reevaluate
        } else {
            IterationRequest::Done
        }
    });

    let summary = engine.evaluate_all();
    assert_eq!(summary.passes, 3);
    assert_eq!(summary.cells_computed, 3);
    assert_eq!(*seen.borrow(), vec![1, 2, 3]);
}

#[test]
fn test_passes_are_bounded() {
    let mut engine = Engine::new(EngineOptions::default().with_max_passes(4));
    set(&mut engine, "A1", "1");

    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    engine.on_iteration_end(move |_| {
        counter.set(counter.get() + 1);
        IterationRequest::Reevaluate
    });
    // every hook runs after every pass, even once another already asked
    engine.on_iteration_end(|_| IterationRequest::Done);

    let summary = engine.evaluate_all();
    assert_eq!(summary.passes, 4);
    assert_eq!(calls.get(), 4);
}

#[test]
fn test_dependency_listeners() {
    let mut engine = Engine::default();
    let changes = Rc::new(RefCell::new(Vec::new()));
    let recorded = Rc::clone(&changes);
    engine.on_dependencies_changed(move |position, ranges| {
        let zones: Vec<String> = ranges.iter().map(|range| range.zone.to_string()).collect();
        recorded.borrow_mut().push((position.address().to_string(), zones));
    });

    set(&mut engine, "B1", "=A1+SUM(A2:A5)");
    set(&mut engine, "B1", "=A1+SUM(A2:A5)+1");
    set(&mut engine, "B1", "=C1");
    set(&mut engine, "B1", "3");
    set(&mut engine, "B2", "4");

    assert_eq!(
        *changes.borrow(),
        vec![
            ("B1".to_string(), vec!["A1".to_string(), "A2:A5".to_string()]),
            ("B1".to_string(), vec!["C1".to_string()]),
            ("B1".to_string(), vec![]),
        ]
    );
}

#[test]
fn test_listeners_hear_about_rebinding_after_sheet_changes() {
    let mut engine = Engine::default();
    set(&mut engine, "A1", "=Data!A1");

    let changed = Rc::new(Cell::new(0));
    let counter = Rc::clone(&changed);
    engine.on_dependencies_changed(move |_, ranges| {
        assert!(ranges.iter().all(Range::is_valid));
        counter.set(counter.get() + 1);
    });

    engine.create_sheet("Data").unwrap();
    assert_eq!(changed.get(), 1);

    // an unrelated sheet leaves the binding as it is
    engine.create_sheet("Other").unwrap();
    assert_eq!(changed.get(), 1);
}

#[test]
fn test_engine_over_existing_workbook() {
    let mut workbook = Workbook::new();
    let sheet = workbook.first_sheet_id();
    let data = workbook.add_sheet("Data").unwrap();
    {
        let ws = workbook.sheet_mut(data).unwrap();
        ws.set_content(0, 0, "20").unwrap();
        ws.set_content(1, 0, "22").unwrap();
    }
    workbook
        .sheet_mut(sheet)
        .unwrap()
        .set_content(0, 0, "=SUM(Data!A1:A2)")
        .unwrap();

    let mut engine = Engine::from_workbook(workbook, EngineOptions::default());
    assert_eq!(
        engine.get_evaluated_cell(CellPosition::new(sheet, 0, 0)).value,
        CellValue::Number(42.0)
    );

    set(&mut engine, "Data!A2", "0");
    assert_eq!(
        engine.get_evaluated_cell(CellPosition::new(sheet, 0, 0)).value,
        CellValue::Number(20.0)
    );
}

#[test]
fn test_growing_a_sheet_refreshes_clipped_references() {
    let mut engine = Engine::default();
    set(&mut engine, "A1", "=A200");
    set(&mut engine, "A2", "=ROWS(B:B)");
    set(&mut engine, "A3", "=COLUMNS(5:5)");
    assert_eq!(value(&mut engine, "A1"), CellValue::Error(CellError::InvalidReference));
    assert_eq!(value(&mut engine, "A2"), CellValue::Number(100.0));
    assert_eq!(value(&mut engine, "A3"), CellValue::Number(26.0));

    set(&mut engine, "B300", "1");
    assert_eq!(value(&mut engine, "A1"), CellValue::Number(0.0));
    assert_eq!(value(&mut engine, "A2"), CellValue::Number(300.0));

    set(&mut engine, "C500", "x");
    assert_eq!(value(&mut engine, "A2"), CellValue::Number(500.0));

    let sheet = engine.workbook().first_sheet_id();
    engine
        .set_cell_format(CellPosition::new(sheet, 0, 29), Some("0.00".into()))
        .unwrap();
    assert_eq!(value(&mut engine, "A3"), CellValue::Number(30.0));

    let lazy: Vec<CellValue> = ["A1", "A2", "A3"].iter().map(|r| value(&mut engine, r)).collect();
    engine.evaluate_all();
    let full: Vec<CellValue> = ["A1", "A2", "A3"].iter().map(|r| value(&mut engine, r)).collect();
    assert_eq!(lazy, full);
}

#[test]
fn test_merge_past_the_extent_grows_the_sheet() {
    let mut engine = Engine::default();
    set(&mut engine, "A1", "=ROWS(C:C)");
    set(&mut engine, "A2", "=E120");
    assert_eq!(value(&mut engine, "A1"), CellValue::Number(100.0));
    assert_eq!(value(&mut engine, "A2"), CellValue::Error(CellError::InvalidReference));

    let sheet = engine.workbook().first_sheet_id();
    engine
        .add_merge(sheet, CellRange::parse("C150:D160").unwrap())
        .unwrap();
    assert_eq!(value(&mut engine, "A1"), CellValue::Number(160.0));
    assert_eq!(value(&mut engine, "A2"), CellValue::Number(0.0));
}

#[test]
fn test_long_running_total_read_lazily() {
    let mut engine = Engine::default();
    set(&mut engine, "A1", "1");
    for row in 2..=200 {
        set(&mut engine, &format!("A{row}"), &format!("=A{}+1", row - 1));
    }
    assert_eq!(value(&mut engine, "A200"), CellValue::Number(200.0));
    assert_eq!(value(&mut engine, "A200"), CellValue::Number(200.0));
    assert_eq!(value(&mut engine, "A73"), CellValue::Number(73.0));

    set(&mut engine, "A1", "11");
    assert_eq!(value(&mut engine, "A200"), CellValue::Number(210.0));
}

#[test]
fn test_long_top_down_chain() {
    let mut engine = Engine::default();
    for row in 1..200 {
        set(&mut engine, &format!("B{row}"), &format!("=B{}+1", row + 1));
    }
    set(&mut engine, "B200", "1");

    let summary = engine.evaluate_all();
    assert_eq!(summary.errors, 0);
    assert_eq!(value(&mut engine, "B1"), CellValue::Number(200.0));
    assert_eq!(value(&mut engine, "B100"), CellValue::Number(101.0));

    set(&mut engine, "B200", "2");
    assert_eq!(value(&mut engine, "B1"), CellValue::Number(201.0));
}
