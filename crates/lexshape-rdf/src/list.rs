//! Generic decoding of linked lists encoded as head/rest cells.
//!
//! RDF collections are one instance (`rdf:first` / `rdf:rest` / `rdf:nil`),
//! but nothing here is RDF-specific: the caller supplies the sentinel test and
//! the two accessors. Decoding never fails; malformed input ends the walk and
//! the reason is reported in [`ListEnd`].

use std::collections::HashSet;
use std::hash::Hash;

/// Upper bound on decoded items when the caller has no better limit.
pub const DEFAULT_MAX_LIST_LEN: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListEnd {
    /// Reached the sentinel.
    Nil,
    /// A cell had no head value or no rest link.
    Truncated,
    /// A cell was revisited.
    Cycle,
    /// Stopped after `max_len` items.
    Limit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedList<T> {
    pub items: Vec<T>,
    pub end: ListEnd,
}

impl<T> DecodedList<T> {
    pub fn is_well_formed(&self) -> bool {
        self.end == ListEnd::Nil
    }
}

/// Walk a linked list from `start`, collecting head values in order.
pub fn decode_linked_list<C, T>(
    start: C,
    is_sentinel: impl Fn(&C) -> bool,
    head: impl Fn(&C) -> Option<T>,
    rest: impl Fn(&C) -> Option<C>,
    max_len: usize,
) -> DecodedList<T>
where
    C: Clone + Eq + Hash,
{
    let mut items = Vec::new();
    let mut visited: HashSet<C> = HashSet::new();
    let mut cell = start;

    let end = loop {
        if is_sentinel(&cell) {
            break ListEnd::Nil;
        }
        if !visited.insert(cell.clone()) {
            break ListEnd::Cycle;
        }
        if items.len() >= max_len {
            break ListEnd::Limit;
        }
        let Some(value) = head(&cell) else {
            break ListEnd::Truncated;
        };
        items.push(value);
        match rest(&cell) {
            Some(next) => cell = next,
            None => break ListEnd::Truncated,
        }
    };

    DecodedList { items, end }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn cells(pairs: &[(u32, char, Option<u32>)]) -> HashMap<u32, (char, Option<u32>)> {
        pairs.iter().map(|(id, v, next)| (*id, (*v, *next))).collect()
    }

    fn decode(map: &HashMap<u32, (char, Option<u32>)>, start: u32, max: usize) -> DecodedList<char> {
        decode_linked_list(
            start,
            |c| *c == 0,
            |c| map.get(c).map(|(v, _)| *v),
            |c| map.get(c).and_then(|(_, n)| *n),
            max,
        )
    }

    #[test]
    fn decodes_until_sentinel() {
        let map = cells(&[(1, 'a', Some(2)), (2, 'b', Some(0))]);
        let out = decode(&map, 1, 16);
        assert_eq!(out.items, vec!['a', 'b']);
        assert_eq!(out.end, ListEnd::Nil);
    }

    #[test]
    fn starting_at_sentinel_is_empty() {
        let out = decode(&HashMap::new(), 0, 16);
        assert!(out.items.is_empty());
        assert!(out.is_well_formed());
    }

    #[test]
    fn missing_rest_keeps_collected_items() {
        let map = cells(&[(1, 'a', Some(2)), (2, 'b', None)]);
        let out = decode(&map, 1, 16);
        assert_eq!(out.items, vec!['a', 'b']);
        assert_eq!(out.end, ListEnd::Truncated);
    }

    #[test]
    fn self_referential_list_terminates() {
        let map = cells(&[(1, 'a', Some(2)), (2, 'b', Some(1))]);
        let out = decode(&map, 1, 16);
        assert_eq!(out.items, vec!['a', 'b']);
        assert_eq!(out.end, ListEnd::Cycle);
    }

    #[test]
    fn limit_bounds_output() {
        let map = cells(&[(1, 'a', Some(2)), (2, 'b', Some(3)), (3, 'c', Some(0))]);
        let out = decode(&map, 1, 2);
        assert_eq!(out.items, vec!['a', 'b']);
        assert_eq!(out.end, ListEnd::Limit);
    }
}
