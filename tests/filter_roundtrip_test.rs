// Copyright 2026 Trailquery Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! End-to-end filter tests: both query surfaces, compilation,
//! decompilation, wire bytes, and match semantics over synthetic trails.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use trailquery::filter::{
    clause_specs, clauses_from_json, clauses_to_json, compile, decompile, parse, ClauseSpec,
    Dialect, FlatFilter, TermSpec,
};
use trailquery::store::{EventStore, StoreBuilder, StoreConfig, Uuid};
use trailquery::ItemWidth;

fn uuid(n: u64) -> Uuid {
    let mut u = [0u8; 16];
    u[..8].copy_from_slice(&n.to_le_bytes());
    u
}

/// 1000 events on one trail, tagged first = i, second = i % 10
fn synthetic_store(width: ItemWidth) -> EventStore {
    let mut cons = StoreBuilder::with_config(&["first", "second"], StoreConfig { item_width: width });
    for i in 0..1000u64 {
        cons.add(uuid(i % 7), i, &[&i.to_string(), &(i % 10).to_string()])
            .unwrap();
    }
    cons.finalize()
}

fn count_matches(store: &EventStore, filter: &FlatFilter) -> usize {
    (0..store.num_trails())
        .map(|id| store.decode_trail(id, Some(filter)).unwrap().len())
        .sum()
}

#[test]
fn test_structured_roundtrip() {
    let store = synthetic_store(ItemWidth::Extended);
    let clauses = clauses_from_json(r#"[{"second": ["1"]}]"#).unwrap();
    let filter = compile(&store, &clauses).unwrap();
    assert_eq!(decompile(&store, &filter).unwrap(), clauses);
    assert_eq!(clauses_to_json(&clauses), r#"[{"second":["1"]}]"#);
}

#[test]
fn test_empty_filter_matches_everything() {
    let store = synthetic_store(ItemWidth::Extended);
    let filter = compile(&store, &[]).unwrap();
    assert!(filter.is_empty());
    assert_eq!(decompile(&store, &filter).unwrap(), vec![]);
    assert_eq!(count_matches(&store, &filter), 1000);
}

#[test]
fn test_conjunction_scenario() {
    // exactly one event has second == 0 and first == 500
    let store = synthetic_store(ItemWidth::Extended);
    let expr = parse("second=0 & first=500", Dialect::Query).unwrap();
    let filter = compile(&store, &clause_specs(&expr).unwrap()).unwrap();
    assert_eq!(count_matches(&store, &filter), 1);
    let matched = store
        .decode_trail(store.trail_id(&uuid(500 % 7)).unwrap(), Some(&filter))
        .unwrap();
    assert_eq!(matched, vec![(500, vec!["500", "0"])]);
}

#[test]
fn test_negated_term_scenario() {
    // 900 of 1000 events have second != 0
    let store = synthetic_store(ItemWidth::Extended);
    let expr = parse("second!=0", Dialect::Cli).unwrap();
    let filter = compile(&store, &clause_specs(&expr).unwrap()).unwrap();
    assert_eq!(count_matches(&store, &filter), 900);
}

#[test]
fn test_surfaces_compile_identically() {
    let store = synthetic_store(ItemWidth::Extended);
    let structured =
        clauses_from_json(r#"[{"second": ["1", {"is_negative": true, "value": "2"}]}]"#).unwrap();
    let expr = parse("second=1 second!=2", Dialect::Cli).unwrap();
    let a = compile(&store, &structured).unwrap();
    let b = compile(&store, &clause_specs(&expr).unwrap()).unwrap();
    assert_eq!(a.words(), b.words());
}

#[test]
fn test_boolean_laws_on_match_sets() {
    let store = synthetic_store(ItemWidth::Extended);
    let count = |src: &str| {
        let expr = parse(src, Dialect::Query).unwrap();
        let filter = compile(&store, &clause_specs(&expr).unwrap()).unwrap();
        count_matches(&store, &filter)
    };
    // A & B is the intersection, A | B the union
    assert_eq!(count("second=1 & first=1"), 1);
    assert_eq!(count("second=1 | second=2"), 200);
    assert_eq!(
        count("second=1 | first=11"),
        count("second=1") + count("first=11") - count("second=1 & first=11")
    );
    // double negation normalizes away
    assert_eq!(count("~~(second=3)"), count("second=3"));
    assert_eq!(count("~(second=3)"), 1000 - count("second=3"));
}

#[test]
fn test_unresolved_equality_matches_nothing() {
    let store = synthetic_store(ItemWidth::Extended);
    let clauses = vec![ClauseSpec::new(vec![TermSpec::eq("second", "doesNotExist")])];
    let filter = compile(&store, &clauses).unwrap();
    assert_eq!(count_matches(&store, &filter), 0);
    // the sentinel decompiles as the always-false form, operator kept
    let back = decompile(&store, &filter).unwrap();
    assert_eq!(back[0].terms.len(), 1);
    assert!(back[0].terms[0].is_unresolvable());
}

#[test]
fn test_unresolved_inequality_matches_everything() {
    let store = synthetic_store(ItemWidth::Extended);
    let clauses = vec![ClauseSpec::new(vec![TermSpec::ne("second", "doesNotExist")])];
    let filter = compile(&store, &clauses).unwrap();
    assert_eq!(count_matches(&store, &filter), 1000);
}

#[test]
fn test_one_bad_term_does_not_poison_the_clause() {
    let store = synthetic_store(ItemWidth::Extended);
    let clauses = vec![ClauseSpec::new(vec![
        TermSpec::eq("second", "doesNotExist"),
        TermSpec::eq("second", "1"),
    ])];
    let filter = compile(&store, &clauses).unwrap();
    assert_eq!(count_matches(&store, &filter), 100);
}

#[test]
fn test_wire_bytes_roundtrip_both_widths() {
    for width in [ItemWidth::Narrow32, ItemWidth::Extended] {
        let store = synthetic_store(width);
        let expr = parse("second=1 second!=2 & first=3", Dialect::Cli).unwrap();
        let filter = compile(&store, &clause_specs(&expr).unwrap()).unwrap();
        let bytes = filter.to_le_bytes(width).unwrap();
        assert_eq!(bytes.len() % width.word_size(), 0);
        let back = FlatFilter::from_le_bytes(width, &bytes).unwrap();
        assert_eq!(back.words(), filter.words());
        assert_eq!(
            decompile(&store, &back).unwrap(),
            decompile(&store, &filter).unwrap()
        );
    }
}

#[test]
fn test_corrupt_wire_bytes_rejected() {
    let store = synthetic_store(ItemWidth::Extended);
    let expr = parse("second=1", Dialect::Query).unwrap();
    let filter = compile(&store, &clause_specs(&expr).unwrap()).unwrap();
    let bytes = filter.to_le_bytes(ItemWidth::Extended).unwrap();
    // clause length overruns the buffer once truncated
    assert!(FlatFilter::from_le_bytes(ItemWidth::Extended, &bytes[..bytes.len() - 8]).is_err());
    // width mismatch never passes silently
    assert!(FlatFilter::from_le_bytes(ItemWidth::Narrow32, &bytes[..4]).is_err());
}

#[test]
fn test_random_clause_lists_roundtrip() {
    let store = synthetic_store(ItemWidth::Extended);
    let mut rng = StdRng::seed_from_u64(0x7261_6e64);
    for _ in 0..50 {
        let num_clauses = rng.gen_range(1..5);
        let clauses: Vec<ClauseSpec> = (0..num_clauses)
            .map(|_| {
                let num_terms = rng.gen_range(1..4);
                ClauseSpec::new(
                    (0..num_terms)
                        .map(|_| {
                            let field = if rng.gen_bool(0.5) { "first" } else { "second" };
                            let value = rng.gen_range(0..10u64).to_string();
                            if rng.gen_bool(0.3) {
                                TermSpec::ne(field, &value)
                            } else {
                                TermSpec::eq(field, &value)
                            }
                        })
                        .collect(),
                )
            })
            .collect();
        let filter = compile(&store, &clauses).unwrap();
        assert_eq!(decompile(&store, &filter).unwrap(), clauses);
    }
}
