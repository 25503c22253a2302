//! End-to-end tests for the lookup generation pipeline.

use metriclookup::{
    pack_entry, render, unpack_entry, CategoryDef, EmitterContext, Error, LookupAssembler,
    MetricDef, PerfectHashBuilder,
};

fn category(name: &str, metrics: &[(&str, &str)]) -> CategoryDef {
    CategoryDef {
        name: name.to_string(),
        metrics: metrics
            .iter()
            .map(|&(name, metric_type)| MetricDef {
                name: name.to_string(),
                metric_type: metric_type.to_string(),
            })
            .collect(),
    }
}

// One category, one metric: every derived value is pinned down exactly.
#[test]
fn single_metric_pipeline() {
    let input = vec![category("perf", &[("page_load", "timing")])];
    let bundle = LookupAssembler::new().assemble(&input).unwrap();

    assert_eq!(bundle.metric_type_ids, vec![("timing".to_string(), 1)]);
    assert_eq!(bundle.categories, vec![("perf".to_string(), 0)]);
    assert_eq!(bundle.category_strings.as_bytes(), b"perf\0");
    assert_eq!(bundle.metric_strings.as_bytes(), b"perf.page_load\0");

    let (fq, entry) = &bundle.metric_entries[0];
    assert_eq!(fq, "perf.page_load");
    assert_eq!(*entry, (1u64 << 59) | (1u64 << 32));
    assert_eq!(*entry, 0x0800_0001_0000_0000);
    assert_eq!(unpack_entry(*entry), (1, 1, 0));
}

// Two metrics sharing a type: ids advance, the type id does not.
#[test]
fn metrics_sharing_a_type() {
    let input = vec![category("ui", &[("click", "event"), ("scroll", "event")])];
    let bundle = LookupAssembler::new().assemble(&input).unwrap();

    assert_eq!(bundle.metric_type_ids, vec![("event".to_string(), 1)]);

    let (click_id, click_type, click_off) = unpack_entry(bundle.metric_entries[0].1);
    let (scroll_id, scroll_type, scroll_off) = unpack_entry(bundle.metric_entries[1].1);

    assert_eq!((click_id, scroll_id), (1, 2));
    assert_eq!((click_type, scroll_type), (1, 1));
    assert_eq!(click_off, 0);
    assert_eq!(scroll_off, "ui.click".len() as u32 + 1);

    // The entries differ only in the metric_id and string_offset fields.
    assert_eq!(
        bundle.metric_entries[0].1,
        pack_entry(1, 1, click_off).unwrap()
    );
    assert_eq!(
        bundle.metric_entries[1].1,
        pack_entry(2, 1, scroll_off).unwrap()
    );
}

// Identical fully-qualified names are a fatal duplicate-key error.
#[test]
fn duplicate_fully_qualified_names() {
    let input = vec![category(
        "perf",
        &[("page_load", "timing"), ("page_load", "counter")],
    )];

    match LookupAssembler::new().assemble(&input) {
        Err(Error::DuplicateKey { key }) => assert_eq!(key, "perf.page_load"),
        other => panic!("expected DuplicateKey, got {other:?}"),
    }
}

// A raw lookup built from one pair answers every query with that pair's
// payload; the verified wrapper rejects the unknown key.
#[test]
fn unknown_key_false_positive_is_rejected() {
    let pairs = vec![(b"perf.a".to_vec(), 0xABCDu64)];
    let lookup = PerfectHashBuilder::build(&pairs, 64).unwrap();
    assert_eq!(lookup.lookup(b"perf.a"), Some(0xABCD));
    assert_eq!(lookup.lookup(b"perf.z"), Some(0xABCD));

    let input = vec![category("perf", &[("a", "counter")])];
    let bundle = LookupAssembler::new().assemble(&input).unwrap();
    assert!(bundle.metric_by_name(b"perf.a").is_some());
    assert_eq!(bundle.metric_by_name(b"perf.z"), None);
}

// Running the pipeline twice over the same input yields byte-identical
// artifacts, including the rendered header.
#[test]
fn pipeline_is_deterministic() {
    let input = vec![
        category("perf", &[("page_load", "timing"), ("frame_time", "timing")]),
        category("ui", &[("click", "event"), ("scroll", "event")]),
        category("net", &[("rtt", "timing"), ("drops", "counter")]),
    ];

    let first = LookupAssembler::new().assemble(&input).unwrap();
    let second = LookupAssembler::new().assemble(&input).unwrap();

    assert_eq!(first, second);
    assert_eq!(
        render(&EmitterContext::from_bundle(&first)),
        render(&EmitterContext::from_bundle(&second))
    );
}

#[test]
fn empty_input_produces_empty_artifacts() {
    let bundle = LookupAssembler::new().assemble(&[]).unwrap();

    assert!(bundle.category_strings.as_bytes().is_empty());
    assert!(bundle.metric_strings.as_bytes().is_empty());
    assert!(bundle.category_lookup.is_empty());
    assert!(bundle.metric_lookup.is_empty());

    // Still renders a valid header.
    let header = render(&EmitterContext::from_bundle(&bundle));
    assert!(header.contains("CategoryByNameLookup"));
    assert!(header.contains("MetricByNameLookup"));
}

// Every supplied key resolves through the verified wrappers; a batch of
// near-miss keys does not.
#[test]
fn verified_wrappers_over_a_larger_corpus() {
    let input: Vec<CategoryDef> = (0..40)
        .map(|c| {
            let name = format!("category{c}");
            let metrics: Vec<(String, String)> = (0..5)
                .map(|m| (format!("metric{m}"), format!("type{}", m % 7)))
                .collect();
            CategoryDef {
                name,
                metrics: metrics
                    .into_iter()
                    .map(|(name, metric_type)| MetricDef { name, metric_type })
                    .collect(),
            }
        })
        .collect();

    let bundle = LookupAssembler::new().assemble(&input).unwrap();
    assert_eq!(bundle.metric_entries.len(), 200);

    // All metric ids unique, all fq offsets unique, every entry unpacks to
    // the offset of its own name.
    let mut seen_ids = std::collections::BTreeSet::new();
    let mut seen_offsets = std::collections::BTreeSet::new();
    for (fq, entry) in &bundle.metric_entries {
        let (metric_id, _, offset) = unpack_entry(*entry);
        assert!(seen_ids.insert(metric_id));
        assert!(seen_offsets.insert(offset));
        assert!(bundle.metric_strings.matches_at(offset, fq.as_bytes()));
    }

    for (name, offset) in &bundle.categories {
        assert_eq!(bundle.category_by_name(name.as_bytes()), Some(*offset));
    }
    for (fq, entry) in &bundle.metric_entries {
        assert_eq!(bundle.metric_by_name(fq.as_bytes()), Some(*entry));
    }

    for c in 0..40 {
        assert_eq!(
            bundle.metric_by_name(format!("category{c}.metric9").as_bytes()),
            None
        );
        assert_eq!(bundle.category_by_name(format!("cat{c}").as_bytes()), None);
    }
    assert_eq!(bundle.metric_by_name(b""), None);
}

// Type ids are first-seen across category boundaries.
#[test]
fn type_ids_span_categories() {
    let input = vec![
        category("perf", &[("page_load", "timing")]),
        category("ui", &[("click", "event"), ("hover_time", "timing")]),
    ];

    let bundle = LookupAssembler::new().assemble(&input).unwrap();
    assert_eq!(
        bundle.metric_type_ids,
        vec![("timing".to_string(), 1), ("event".to_string(), 2)]
    );

    let (_, hover_type, _) = unpack_entry(bundle.metric_entries[2].1);
    assert_eq!(hover_type, 1);
}
