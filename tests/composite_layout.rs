use anyhow::Result;
use rustyflow::catalog::{ModuleCatalog, ModuleDef};
use rustyflow::config::EditorConfig;
use rustyflow::editor::EditorState;
use rustyflow::layout::CharWidthMeasurer;
use rustyflow::model::Polarity;

const REDUCTION: &str = r#"{
  "modules": [
    { "module": "ncnr.refl.super_load", "title": "load spec" },
    { "module": "ncnr.refl.super_load", "title": "load bg" },
    { "module": "ncnr.refl.subtract", "title": "subtract" },
    { "module": "ncnr.refl.normalize", "title": "normalize" },
    { "module": "ncnr.refl.combined_module", "title": "reduction" }
  ],
  "wires": [
    { "source": [0, "output"], "target": [2, "data"] },
    { "source": [1, "output"], "target": [2, "background"] },
    { "source": [2, "output"], "target": [3, "data"] }
  ]
}"#;

fn catalog() -> ModuleCatalog {
    [
        ("ncnr.refl.super_load", ModuleDef::from_ids(&[], &["output"])),
        (
            "ncnr.refl.subtract",
            ModuleDef::from_ids(&["data", "background"], &["output"]),
        ),
        ("ncnr.refl.normalize", ModuleDef::from_ids(&["data"], &["output"])),
    ]
    .into_iter()
    .map(|(name, def)| (name.to_string(), def))
    .collect()
}

#[test]
fn fan_in_reduction_lays_out_in_two_rows() -> Result<()> {
    let mut state = EditorState::new(EditorConfig::default()).with_catalog(catalog());
    state.import_json(REDUCTION)?;
    assert_eq!(state.combined_modules(), vec![4]);

    let layout = state
        .layout_combined(4, &CharWidthMeasurer::new(7.0))
        .expect("combined module");
    let width = 85.0;

    assert_eq!(layout.entry_points, vec![0, 1]);
    assert_eq!(layout.exit_points, vec![3]);
    let at = |m: usize| {
        let p = layout.placement(m).unwrap();
        (p.x, p.y)
    };
    assert_eq!(at(0), (0.0, 0.0));
    assert_eq!(at(2), (width + 40.0, 0.0));
    assert_eq!(at(3), (2.0 * (width + 40.0), 0.0));
    // subtract has two terminal rows, so the second entry starts below it.
    assert_eq!(at(1), (0.0, 60.0));
    assert_eq!(layout.placement(2).unwrap().joined_input, vec![0, 1]);

    assert!(layout.boundary_inputs.is_empty());
    let outputs: Vec<_> = layout
        .boundary_outputs
        .iter()
        .map(|b| b.exposed_id.as_str())
        .collect();
    assert_eq!(outputs, vec!["3:output"]);

    let combined = state.graph().module(4).unwrap();
    assert!(combined.inputs().is_empty());
    assert!(combined.has_terminal(Polarity::Output, "3:output"));
    Ok(())
}

#[test]
fn layout_of_plain_module_is_none() -> Result<()> {
    let mut state = EditorState::new(EditorConfig::default()).with_catalog(catalog());
    state.import_json(REDUCTION)?;
    assert!(state.layout_combined(0, &CharWidthMeasurer::new(7.0)).is_none());
    assert!(state.layout_combined(99, &CharWidthMeasurer::new(7.0)).is_none());
    Ok(())
}

#[test]
fn autosized_modules_widen_the_row() -> Result<()> {
    let config = EditorConfig {
        autosize_modules: true,
        ..Default::default()
    };
    let mut state = EditorState::new(config).with_catalog(catalog());
    state.import_json(REDUCTION)?;
    let layout = state
        .layout_combined(4, &|text: &str| text.len() as f64 * 10.0)
        .expect("combined module");
    // "load spec" is 9 chars: 90 + 2 * 5 padding.
    assert_eq!(layout.placement(0).unwrap().width, 100.0);
    assert_eq!(layout.placement(2).unwrap().x, 140.0);
    Ok(())
}
