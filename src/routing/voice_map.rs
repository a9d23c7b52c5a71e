use std::sync::Arc;

/*
Voice Index Mapping
===================

A polyphonic signal carries one lane per voice. The voice allocator numbers
those lanes, but routing stages in between (splitters, voice-window selectors,
reordering stages) may renumber them before the signal reaches a consumer. A
consumer that wants to hold or release "its" voice 2 has to know which voice
the allocator calls that.

A `VoiceMapping` answers both directions for one stage:

  to_upstream(d)   downstream index → upstream index. Always defined: every
                   lane a stage outputs comes from some upstream lane.
  to_downstream(u) upstream index → downstream index, or None when the stage
                   does not pass that upstream voice through at all.


Composition
-----------

A signal path is a chain of stages. `compose(outer, inner)` collapses two of
them into one mapping, `outer` being the stage closer to the consumer:

  consumer ── [outer] ── [inner] ── allocator

    to_upstream   = inner.to_upstream ∘ outer.to_upstream
    to_downstream = u ↦ inner.to_downstream(u).and_then(outer.to_downstream)

The partial direction short-circuits: once any stage reports None, no later
stage is asked, so a consumer never sees an index that does not trace back
through every stage. Indices are plain integers, so chains of any length are
exact. `Identity` is the unit on both sides.
*/

pub trait VoiceMapping {
    /// Translate a local (downstream) voice index to the upstream index.
    fn to_upstream(&self, voice: usize) -> usize;

    /// Translate an upstream voice index to the local index, if the voice is
    /// represented at this stage.
    fn to_downstream(&self, voice: usize) -> Option<usize>;
}

/// A shared, thread-safe mapping, for graphs built at runtime.
pub type SharedMapping = Arc<dyn VoiceMapping + Send + Sync>;

/// Pass-through stage that does not renumber voices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Identity;

impl VoiceMapping for Identity {
    fn to_upstream(&self, voice: usize) -> usize {
        voice
    }

    fn to_downstream(&self, voice: usize) -> Option<usize> {
        Some(voice)
    }
}

/// Two stages collapsed into one. Built by [`compose`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Composed<O, I> {
    outer: O,
    inner: I,
}

impl<O, I> Composed<O, I> {
    pub fn outer(&self) -> &O {
        &self.outer
    }

    pub fn inner(&self) -> &I {
        &self.inner
    }
}

impl<O: VoiceMapping, I: VoiceMapping> VoiceMapping for Composed<O, I> {
    fn to_upstream(&self, voice: usize) -> usize {
        self.inner.to_upstream(self.outer.to_upstream(voice))
    }

    fn to_downstream(&self, voice: usize) -> Option<usize> {
        self.inner
            .to_downstream(voice)
            .and_then(|middle| self.outer.to_downstream(middle))
    }
}

/// Collapse `outer` (closer to the consumer) and `inner` (closer to the
/// allocator) into a single mapping.
pub fn compose<O: VoiceMapping, I: VoiceMapping>(outer: O, inner: I) -> Composed<O, I> {
    Composed { outer, inner }
}

/// Fold a whole signal path into one mapping.
///
/// Stages are given consumer side first. An empty path is the identity.
pub fn compose_chain<I>(stages: I) -> SharedMapping
where
    I: IntoIterator<Item = SharedMapping>,
{
    stages
        .into_iter()
        .fold(Arc::new(Identity) as SharedMapping, |acc, stage| {
            Arc::new(compose(acc, stage)) as SharedMapping
        })
}

/// A stage exposing a contiguous window of upstream voices, renumbered from 0.
///
/// Downstream voice `i` is upstream voice `base + i`. Upstream voices outside
/// `base..base + count` are not represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Offset {
    base: usize,
    count: usize,
}

impl Offset {
    pub fn new(base: usize, count: usize) -> Self {
        Self { base, count }
    }
}

impl VoiceMapping for Offset {
    fn to_upstream(&self, voice: usize) -> usize {
        self.base.saturating_add(voice)
    }

    fn to_downstream(&self, voice: usize) -> Option<usize> {
        let local = voice.checked_sub(self.base)?;
        (local < self.count).then_some(local)
    }
}

/// A stage with an explicit remapping table.
///
/// Downstream voice `i` is upstream voice `table[i]`; indices past the end of
/// the table pass through unchanged. The inverse is kept as a sorted list of
/// `(upstream, local)` pairs, so its size follows the table and not the
/// largest voice index in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    upstream: Box<[usize]>,
    inverse: Box<[(usize, usize)]>,
}

impl Table {
    /// If two lanes reach the same upstream voice, table entries win over
    /// pass-through lanes and later entries win over earlier ones.
    pub fn new(upstream: impl Into<Vec<usize>>) -> Self {
        let upstream: Vec<usize> = upstream.into();

        let mut inverse: Vec<(usize, usize)> = upstream.iter().copied().zip(0..).collect();
        // Highest local index first within a voice, so dedup keeps the last entry
        inverse.sort_unstable_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));
        inverse.dedup_by_key(|&mut (voice, _)| voice);

        Self {
            upstream: upstream.into_boxed_slice(),
            inverse: inverse.into_boxed_slice(),
        }
    }

    pub fn len(&self) -> usize {
        self.upstream.len()
    }

    pub fn is_empty(&self) -> bool {
        self.upstream.is_empty()
    }
}

impl VoiceMapping for Table {
    fn to_upstream(&self, voice: usize) -> usize {
        self.upstream.get(voice).copied().unwrap_or(voice)
    }

    fn to_downstream(&self, voice: usize) -> Option<usize> {
        match self.inverse.binary_search_by_key(&voice, |&(upstream, _)| upstream) {
            Ok(index) => Some(self.inverse[index].1),
            // Not in the table: only pass-through lanes can land here
            Err(_) => (voice >= self.upstream.len()).then_some(voice),
        }
    }
}

impl<M: VoiceMapping + ?Sized> VoiceMapping for &M {
    fn to_upstream(&self, voice: usize) -> usize {
        (**self).to_upstream(voice)
    }

    fn to_downstream(&self, voice: usize) -> Option<usize> {
        (**self).to_downstream(voice)
    }
}

impl<M: VoiceMapping + ?Sized> VoiceMapping for Box<M> {
    fn to_upstream(&self, voice: usize) -> usize {
        (**self).to_upstream(voice)
    }

    fn to_downstream(&self, voice: usize) -> Option<usize> {
        (**self).to_downstream(voice)
    }
}

impl<M: VoiceMapping + ?Sized> VoiceMapping for Arc<M> {
    fn to_upstream(&self, voice: usize) -> usize {
        (**self).to_upstream(voice)
    }

    fn to_downstream(&self, voice: usize) -> Option<usize> {
        (**self).to_downstream(voice)
    }
}

pub trait VoiceMappingExt: VoiceMapping + Sized {
    /// `self` stays closer to the consumer, `inner` closer to the allocator.
    fn compose<I: VoiceMapping>(self, inner: I) -> Composed<Self, I> {
        compose(self, inner)
    }

    fn shared(self) -> SharedMapping
    where
        Self: Send + Sync + 'static,
    {
        Arc::new(self)
    }
}

impl<T: VoiceMapping> VoiceMappingExt for T {}

#[cfg(test)]
mod tests {
    use super::*;

    /// A stage that drops one upstream voice and keeps the rest in order.
    struct Without(usize);

    impl VoiceMapping for Without {
        fn to_upstream(&self, voice: usize) -> usize {
            if voice >= self.0 {
                voice + 1
            } else {
                voice
            }
        }

        fn to_downstream(&self, voice: usize) -> Option<usize> {
            match voice.cmp(&self.0) {
                std::cmp::Ordering::Less => Some(voice),
                std::cmp::Ordering::Equal => None,
                std::cmp::Ordering::Greater => Some(voice - 1),
            }
        }
    }

    fn samples() -> Vec<SharedMapping> {
        vec![
            Arc::new(Identity),
            Arc::new(Offset::new(4, 4)),
            Arc::new(Table::new(vec![3, 0, 2, 1])),
            Arc::new(Without(2)),
        ]
    }

    #[test]
    fn identity_is_a_left_and_right_unit() {
        for mapping in samples() {
            let left = compose(Identity, mapping.clone());
            let right = compose(mapping.clone(), Identity);
            for voice in 0..16 {
                assert_eq!(left.to_upstream(voice), mapping.to_upstream(voice));
                assert_eq!(right.to_upstream(voice), mapping.to_upstream(voice));
                assert_eq!(left.to_downstream(voice), mapping.to_downstream(voice));
                assert_eq!(right.to_downstream(voice), mapping.to_downstream(voice));
            }
        }
    }

    #[test]
    fn composition_is_associative() {
        let a = || Offset::new(1, 6);
        let b = || Table::new(vec![5, 4, 3, 2, 1, 0, 6]);
        let c = || Without(3);

        let left = compose(compose(a(), b()), c());
        let right = compose(a(), compose(b(), c()));
        for voice in 0..12 {
            assert_eq!(left.to_upstream(voice), right.to_upstream(voice));
            assert_eq!(left.to_downstream(voice), right.to_downstream(voice));
        }
    }

    #[test]
    fn upstream_applies_outer_then_inner() {
        // consumer -> Offset(2) -> Table -> allocator
        let path = Offset::new(2, 4).compose(Table::new(vec![7, 6, 5, 4, 3, 2]));
        assert_eq!(path.to_upstream(0), 5);
        assert_eq!(path.to_upstream(3), 2);
        assert_eq!(path.to_downstream(5), Some(0));
        assert_eq!(path.to_downstream(2), Some(3));
    }

    #[test]
    fn absent_anywhere_in_a_chain_is_absent() {
        let stage_a = Offset::new(0, 3);
        let stage_b = Without(1);
        let stage_c = Offset::new(2, 8);
        let chain = stage_a.compose(stage_b).compose(stage_c);

        // Upstream 0, 1 fall below stage C's window
        assert_eq!(chain.to_downstream(0), None);
        assert_eq!(chain.to_downstream(1), None);
        // Upstream 3 is C-local 1, which stage B drops
        assert_eq!(chain.to_downstream(3), None);
        // Upstream 2 is C-local 0, B-local 0, A-local 0
        assert_eq!(chain.to_downstream(2), Some(0));
        // Upstream 6 is C-local 4, B-local 3, outside A's window of 3
        assert_eq!(chain.to_downstream(6), None);
    }

    #[test]
    fn round_trip_through_a_chain() {
        let chain = compose_chain(samples());
        for voice in 0..3 {
            let upstream = chain.to_upstream(voice);
            assert_eq!(chain.to_downstream(upstream), Some(voice));
        }
    }

    #[test]
    fn long_chains_stay_exact() {
        let chain = compose_chain((0..1000).map(|_| Offset::new(1, usize::MAX).shared()));
        assert_eq!(chain.to_upstream(5), 1005);
        assert_eq!(chain.to_downstream(1005), Some(5));
        assert_eq!(chain.to_downstream(999), None);
    }

    #[test]
    fn empty_chain_is_identity() {
        let chain = compose_chain(Vec::new());
        assert_eq!(chain.to_upstream(9), 9);
        assert_eq!(chain.to_downstream(9), Some(9));
    }

    #[test]
    fn table_passes_through_past_its_end() {
        let table = Table::new(vec![1, 0]);
        assert_eq!(table.to_upstream(0), 1);
        assert_eq!(table.to_upstream(5), 5);
        assert_eq!(table.to_downstream(0), Some(1));
        assert_eq!(table.to_downstream(5), Some(5));

        // Upstream 3 is only reachable through lane 0 of this table
        let sparse = Table::new(vec![3]);
        assert_eq!(sparse.to_downstream(3), Some(0));
        assert_eq!(sparse.to_downstream(2), Some(2));
        assert_eq!(sparse.to_downstream(0), None);
    }

    #[test]
    fn table_accepts_extreme_voice_indices() {
        let table = Table::new(vec![usize::MAX, 1 << 40]);
        assert_eq!(table.to_upstream(0), usize::MAX);
        assert_eq!(table.to_upstream(1), 1 << 40);
        assert_eq!(table.to_downstream(usize::MAX), Some(0));
        assert_eq!(table.to_downstream(1 << 40), Some(1));
        assert_eq!(table.to_downstream(1), None);
        assert_eq!(table.to_downstream(7), Some(7));
    }

    #[test]
    fn later_table_entries_win() {
        let table = Table::new(vec![4, 2, 4]);
        assert_eq!(table.to_downstream(4), Some(2));
        assert_eq!(table.to_downstream(2), Some(1));
    }

    #[test]
    fn offset_window_bounds() {
        let window = Offset::new(4, 2);
        assert_eq!(window.to_downstream(3), None);
        assert_eq!(window.to_downstream(4), Some(0));
        assert_eq!(window.to_downstream(5), Some(1));
        assert_eq!(window.to_downstream(6), None);
    }
}
