use std::borrow::Borrow;
use std::hash::{BuildHasher, Hash};

use hashbrown::hash_map::{DefaultHashBuilder, HashMap, Iter, Keys, Values};

/// One complete, internally consistent copy of the cached dataset
///
/// A snapshot is never modified after it has been published, holding an `Arc<Snapshot>` is
/// a stable view even while the cache reloads underneath it.
#[derive(Clone, Debug)]
pub struct Snapshot<K, V, S = DefaultHashBuilder> {
    map: HashMap<K, V, S>,
}

impl<K, V, S> Snapshot<K, V, S> {
    pub fn empty(build_hasher: S) -> Self {
        Snapshot {
            map: HashMap::with_hasher(build_hasher),
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        self.map.iter()
    }

    pub fn keys(&self) -> Keys<'_, K, V> {
        self.map.keys()
    }

    pub fn values(&self) -> Values<'_, K, V> {
        self.map.values()
    }
}

impl<K, V, S> Snapshot<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    /// Copy `data` into a fresh map, later pairs overwrite earlier ones with the same key
    pub(crate) fn collect_from<I>(data: I, build_hasher: S) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let data = data.into_iter();
        let mut map = HashMap::with_capacity_and_hasher(data.size_hint().0, build_hasher);

        for (key, value) in data {
            map.insert(key, value);
        }

        Snapshot { map }
    }

    pub(crate) fn shrink_to_fit(&mut self) {
        self.map.shrink_to_fit();
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.get(key)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.contains_key(key)
    }

    pub(crate) fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.map.insert(key, value)
    }

    pub(crate) fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.remove(key)
    }
}

impl<'a, K, V, S> IntoIterator for &'a Snapshot<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.map.iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_collect_last_write_wins() {
        let snapshot = Snapshot::collect_from(
            vec![("a", 1), ("b", 2), ("a", 3)],
            DefaultHashBuilder::default(),
        );

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get("a"), Some(&3));
        assert_eq!(snapshot.get("b"), Some(&2));
    }

    #[test]
    fn test_borrowed_lookup() {
        let snapshot = Snapshot::collect_from(
            vec![(String::from("key"), 1u32)],
            DefaultHashBuilder::default(),
        );

        assert!(snapshot.contains_key("key"));
        assert!(!snapshot.contains_key("other"));

        let mut pairs: Vec<_> = snapshot.iter().collect();
        pairs.sort();
        assert_eq!(pairs, vec![(&String::from("key"), &1)]);
    }

    #[test]
    fn test_empty() {
        let snapshot = Snapshot::<u8, u8>::empty(DefaultHashBuilder::default());

        assert!(snapshot.is_empty());
        assert_eq!(snapshot.len(), 0);
        assert_eq!((&snapshot).into_iter().count(), 0);
    }
}
