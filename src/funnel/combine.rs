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

//! Set combinators
//!
//! Builders that compose [`Set`]s across funnels: [`conjunction`],
//! [`disjunction`] and [`difference`] produce complex-set trees,
//! [`venn`] reports union/intersection/difference cardinalities, and
//! [`count`] evaluates several queries against several funnels with the
//! queries compiled once.
//!
//! A complex set holds at most [`MAX_MASK_BITS`] children, so wide
//! conjunctions and disjunctions partition their inputs round-robin into
//! that many buckets, combine each bucket recursively, and apply the same
//! operator over the bucket results. The match set is identical to the
//! unbounded operation; only the tree gets deeper.

use crate::core::Result;
use crate::filter::Expression;
use crate::funnel::db::{FunnelDb, FunnelId, MAX_MASK_BITS};
use crate::funnel::iter::SetIter;
use crate::funnel::set::{MaskClause, MaskCnf, Set};

/// Aggregate cardinalities of a group of sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Venn {
    /// Entities in at least one set
    pub union_size: u64,
    /// Entities in every set
    pub intersection_size: u64,
    /// Entities in some but not all sets
    pub difference_size: u64,
}

/// Entities present in every child set.
///
/// One single-bit clause per child, which also lets iteration stop as
/// soon as any child runs out.
pub fn conjunction(sets: Vec<Set>) -> Result<Set> {
    bucketed(sets, conjunction_cnf, conjunction)
}

/// Entities present in at least one child set
pub fn disjunction(sets: Vec<Set>) -> Result<Set> {
    bucketed(sets, disjunction_cnf, disjunction)
}

/// Entities in `include` but not in `exclude`
pub fn difference(include: Set, exclude: Set) -> Result<Set> {
    Set::complex(
        vec![include, exclude],
        MaskCnf::new(vec![
            MaskClause {
                terms: 0b01,
                nterms: 0,
            },
            MaskClause {
                terms: 0,
                nterms: 0b10,
            },
        ]),
    )
}

fn conjunction_cnf(n: usize) -> MaskCnf {
    MaskCnf::new(
        (0..n)
            .map(|i| MaskClause {
                terms: 1 << i,
                nterms: 0,
            })
            .collect(),
    )
}

fn disjunction_cnf(n: usize) -> MaskCnf {
    let terms = if n >= MAX_MASK_BITS {
        !0
    } else {
        (1u64 << n) - 1
    };
    MaskCnf::new(vec![MaskClause { terms, nterms: 0 }])
}

fn bucketed(
    sets: Vec<Set>,
    cnf: fn(usize) -> MaskCnf,
    combine: fn(Vec<Set>) -> Result<Set>,
) -> Result<Set> {
    if sets.len() <= MAX_MASK_BITS {
        let n = sets.len();
        return Set::complex(sets, cnf(n));
    }
    let mut buckets: Vec<Vec<Set>> = (0..MAX_MASK_BITS).map(|_| Vec::new()).collect();
    for (i, set) in sets.into_iter().enumerate() {
        buckets[i % MAX_MASK_BITS].push(set);
    }
    let children = buckets
        .into_iter()
        .map(combine)
        .collect::<Result<Vec<_>>>()?;
    Set::complex(children, cnf(MAX_MASK_BITS))
}

/// Number of entities in a set
pub fn count_set(db: &FunnelDb<'_>, set: &Set) -> Result<u64> {
    Ok(SetIter::new(db, set)?.count() as u64)
}

/// Count several CNFs over one funnel in a single pass.
///
/// The whole funnel row is walked once; every member's mask is evaluated
/// against each CNF.
pub fn count_family(db: &FunnelDb<'_>, funnel_id: FunnelId, cnfs: &[MaskCnf]) -> Result<Vec<u64>> {
    let all = Set::simple(funnel_id, MaskCnf::empty());
    let mut counts = vec![0u64; cnfs.len()];
    for elem in SetIter::new(db, &all)? {
        for (i, cnf) in cnfs.iter().enumerate() {
            if cnf.eval(elem.mask) {
                counts[i] += 1;
            }
        }
    }
    Ok(counts)
}

/// Per-funnel counts for several queries.
///
/// Queries are compiled to mask CNFs once and reused across every funnel
/// id; each funnel is then counted as one family pass.
pub fn count(
    db: &FunnelDb<'_>,
    funnel_ids: &[FunnelId],
    queries: &[Expression],
) -> Result<Vec<(FunnelId, Vec<u64>)>> {
    let cnfs = queries
        .iter()
        .map(|q| db.compile_mask_cnf(q))
        .collect::<Result<Vec<_>>>()?;
    funnel_ids
        .iter()
        .map(|&id| Ok((id, count_family(db, id, &cnfs)?)))
        .collect()
}

/// Union/intersection/difference cardinalities across simple sets.
///
/// Each pair selects one funnel and an optional mask query; the empty
/// expression leaves the funnel unfiltered. Difference is everything in
/// the union that is not in the intersection.
pub fn venn(db: &FunnelDb<'_>, id_queries: &[(FunnelId, Expression)]) -> Result<Venn> {
    let sets = id_queries
        .iter()
        .map(|(id, q)| Ok(Set::simple(*id, db.compile_mask_cnf(q)?)))
        .collect::<Result<Vec<Set>>>()?;
    let union_size = count_set(db, &disjunction(sets.clone())?)?;
    let intersection_size = count_set(db, &conjunction(sets)?)?;
    Ok(Venn {
        union_size,
        intersection_size,
        difference_size: union_size - intersection_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{parse, Dialect};
    use crate::funnel::db::FunnelParams;
    use crate::store::{EventStore, StoreBuilder, Uuid};

    fn uuid(n: u8) -> Uuid {
        let mut u = [0u8; 16];
        u[0] = n;
        u
    }

    fn store() -> EventStore {
        let mut cons = StoreBuilder::new(&["page", "action"]);
        cons.add(uuid(0), 1, &["front", "view"]).unwrap();
        cons.add(uuid(1), 1, &["front", "view"]).unwrap();
        cons.add(uuid(1), 2, &["shop", "buy"]).unwrap();
        cons.add(uuid(2), 1, &["shop", "view"]).unwrap();
        cons.add(uuid(3), 1, &["shop", "buy"]).unwrap();
        cons.finalize()
    }

    fn db(store: &EventStore) -> FunnelDb<'_> {
        FunnelDb::build(
            store,
            &FunnelParams {
                key_groups: vec![vec!["page".into()]],
                mask_field: "action".into(),
            },
        )
        .unwrap()
    }

    fn page(db: &FunnelDb<'_>, value: &str) -> Set {
        let id = db.resolve_funnel(&[("page", value)]).unwrap();
        Set::simple(id, MaskCnf::empty())
    }

    #[test]
    fn test_conjunction() {
        let store = store();
        let db = db(&store);
        // front = {0, 1}, shop = {1, 2, 3}
        let set = conjunction(vec![page(&db, "front"), page(&db, "shop")]).unwrap();
        assert_eq!(count_set(&db, &set).unwrap(), 1);
    }

    #[test]
    fn test_disjunction() {
        let store = store();
        let db = db(&store);
        let set = disjunction(vec![page(&db, "front"), page(&db, "shop")]).unwrap();
        assert_eq!(count_set(&db, &set).unwrap(), 4);
    }

    #[test]
    fn test_difference() {
        let store = store();
        let db = db(&store);
        let set = difference(page(&db, "shop"), page(&db, "front")).unwrap();
        assert_eq!(count_set(&db, &set).unwrap(), 2); // entities 2 and 3
    }

    #[test]
    fn test_bucketing_transparency() {
        let store = store();
        let db = db(&store);
        // repeat the same two sets far past the width bound; the match
        // set must equal the unbucketed two-set operation
        let mut wide = Vec::new();
        for _ in 0..100 {
            wide.push(page(&db, "front"));
            wide.push(page(&db, "shop"));
        }
        let narrow_and = conjunction(vec![page(&db, "front"), page(&db, "shop")]).unwrap();
        let wide_and = conjunction(wide.clone()).unwrap();
        assert_eq!(
            count_set(&db, &wide_and).unwrap(),
            count_set(&db, &narrow_and).unwrap()
        );
        let narrow_or = disjunction(vec![page(&db, "front"), page(&db, "shop")]).unwrap();
        let wide_or = disjunction(wide).unwrap();
        assert_eq!(
            count_set(&db, &wide_or).unwrap(),
            count_set(&db, &narrow_or).unwrap()
        );
    }

    #[test]
    fn test_venn() {
        let store = store();
        let db = db(&store);
        let front = db.resolve_funnel(&[("page", "front")]).unwrap();
        let shop = db.resolve_funnel(&[("page", "shop")]).unwrap();
        let v = venn(
            &db,
            &[
                (front, Expression::empty()),
                (shop, Expression::empty()),
            ],
        )
        .unwrap();
        assert_eq!(
            v,
            Venn {
                union_size: 4,
                intersection_size: 1,
                difference_size: 3,
            }
        );
    }

    #[test]
    fn test_venn_with_mask_queries() {
        let store = store();
        let db = db(&store);
        let shop = db.resolve_funnel(&[("page", "shop")]).unwrap();
        let buyers = parse("buy", Dialect::Query).unwrap();
        let v = venn(
            &db,
            &[(shop, Expression::empty()), (shop, buyers)],
        )
        .unwrap();
        // shop = {1, 2, 3}, shop buyers = {1, 3}
        assert_eq!(v.union_size, 3);
        assert_eq!(v.intersection_size, 2);
        assert_eq!(v.difference_size, 1);
    }

    #[test]
    fn test_count_family() {
        let store = store();
        let db = db(&store);
        let shop = db.resolve_funnel(&[("page", "shop")]).unwrap();
        let queries = [
            parse("view", Dialect::Query).unwrap(),
            parse("buy", Dialect::Query).unwrap(),
            parse("view & buy", Dialect::Query).unwrap(),
        ];
        let counts = count(&db, &[shop], &queries).unwrap();
        assert_eq!(counts, vec![(shop, vec![1, 2, 0])]);
    }

    #[test]
    fn test_count_reuses_queries_across_funnels() {
        let store = store();
        let db = db(&store);
        let front = db.resolve_funnel(&[("page", "front")]).unwrap();
        let shop = db.resolve_funnel(&[("page", "shop")]).unwrap();
        let queries = [parse("view", Dialect::Query).unwrap()];
        let counts = count(&db, &[front, shop], &queries).unwrap();
        assert_eq!(counts, vec![(front, vec![2]), (shop, vec![1])]);
    }

    #[test]
    fn test_unknown_query_term_is_fatal() {
        let store = store();
        let db = db(&store);
        let shop = db.resolve_funnel(&[("page", "shop")]).unwrap();
        let queries = [parse("refund", Dialect::Query).unwrap()];
        assert!(count(&db, &[shop], &queries).is_err());
    }
}
