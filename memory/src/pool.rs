use parking_lot::Mutex;

/// Object that can be kept in an `ObjectPool`.
///
/// Released objects are returned to their default state by `reuse`,
/// so acquired objects are indistinguishable from fresh ones.
pub trait Reuse: Default {
    /// Return object to default state.
    /// Implementations may keep heap storage for the next use.
    fn reuse(&mut self) {
        *self = Self::default();
    }
}

/// Object counts of a pool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolCounts {
    /// Objects created by the pool.
    pub created: u64,
    /// Objects created and not destroyed, either in use or resident.
    pub alive: u64,
    /// Objects waiting in the free list.
    pub resident: u64,
}

impl std::ops::Add for PoolCounts {
    type Output = PoolCounts;

    fn add(self, rhs: PoolCounts) -> PoolCounts {
        PoolCounts {
            created: self.created + rhs.created,
            alive: self.alive + rhs.alive,
            resident: self.resident + rhs.resident,
        }
    }
}

/// Free-list pool of objects of one type.
///
/// Not synchronized. Use `SyncObjectPool` when objects are released from other threads.
#[derive(Debug)]
pub struct ObjectPool<T> {
    free: Vec<T>,
    counts: PoolCounts,
    pooling: bool,
}

impl<T> ObjectPool<T>
where
    T: Reuse,
{
    /// Create pool. Without `pooling` released objects are destroyed immediately.
    pub fn new(pooling: bool) -> Self {
        ObjectPool {
            free: Vec::new(),
            counts: PoolCounts::default(),
            pooling,
        }
    }

    /// Check if pool keeps released objects.
    pub fn is_pooling(&self) -> bool {
        self.pooling
    }

    /// Object counts.
    pub fn counts(&self) -> PoolCounts {
        self.counts
    }

    /// Take object from the free list or create new one.
    pub fn acquire(&mut self) -> T {
        match self.free.pop() {
            Some(object) => {
                self.counts.resident -= 1;
                object
            }
            None => {
                self.counts.created += 1;
                self.counts.alive += 1;
                T::default()
            }
        }
    }

    /// Return object acquired from this pool.
    pub fn release(&mut self, mut object: T) {
        if self.pooling {
            object.reuse();
            self.free.push(object);
            self.counts.resident += 1;
        } else {
            self.counts.alive -= 1;
        }
    }

    /// Record that an acquired object was destroyed instead of released.
    pub fn forget(&mut self) {
        self.counts.alive -= 1;
    }

    /// Destroy every resident object.
    pub fn clear(&mut self) {
        let count = self.free.len() as u64;
        self.free.clear();
        self.free.shrink_to_fit();
        self.counts.alive -= count;
        self.counts.resident = 0;
    }
}

/// `ObjectPool` behind a lock, for objects returned from other threads.
#[derive(Debug)]
pub struct SyncObjectPool<T> {
    inner: Mutex<ObjectPool<T>>,
}

impl<T> SyncObjectPool<T>
where
    T: Reuse,
{
    /// Create pool.
    pub fn new(pooling: bool) -> Self {
        SyncObjectPool {
            inner: Mutex::new(ObjectPool::new(pooling)),
        }
    }

    /// Take object from the free list or create new one.
    pub fn acquire_safely(&self) -> T {
        self.inner.lock().acquire()
    }

    /// Return object acquired from this pool.
    pub fn release_safely(&self, object: T) {
        self.inner.lock().release(object)
    }

    /// Record that an acquired object was destroyed instead of released.
    pub fn forget_safely(&self) {
        self.inner.lock().forget()
    }

    /// Destroy every resident object.
    pub fn clear(&self) {
        self.inner.lock().clear()
    }

    /// Object counts.
    pub fn counts(&self) -> PoolCounts {
        self.inner.lock().counts()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::{sync::Arc, thread};

    #[derive(Debug, Default, PartialEq)]
    struct Payload {
        values: Vec<u32>,
    }

    impl Reuse for Payload {
        fn reuse(&mut self) {
            self.values.clear();
        }
    }

    #[test]
    fn acquire_reuses_released_objects() {
        let mut pool = ObjectPool::<Payload>::new(true);
        let mut object = pool.acquire();
        object.values.extend(0..100);
        pool.release(object);

        assert_eq!(
            pool.counts(),
            PoolCounts {
                created: 1,
                alive: 1,
                resident: 1,
            }
        );

        let object = pool.acquire();
        assert!(object.values.is_empty());
        assert!(object.values.capacity() >= 100);
        assert_eq!(pool.counts().created, 1);
        assert_eq!(pool.counts().resident, 0);
    }

    #[test]
    fn disabled_pooling_destroys_objects() {
        let mut pool = ObjectPool::<Payload>::new(false);
        let first = pool.acquire();
        let second = pool.acquire();
        pool.release(first);
        pool.release(second);

        assert_eq!(
            pool.counts(),
            PoolCounts {
                created: 2,
                alive: 0,
                resident: 0,
            }
        );
    }

    #[test]
    fn clear_destroys_resident_objects() {
        let mut pool = ObjectPool::<Payload>::new(true);
        let objects: Vec<_> = (0..4).map(|_| pool.acquire()).collect();
        for object in objects {
            pool.release(object);
        }
        let kept = pool.acquire();
        pool.clear();

        assert_eq!(pool.counts().alive, 1);
        assert_eq!(pool.counts().resident, 0);
        pool.release(kept);
        assert_eq!(pool.counts().resident, 1);
    }

    #[test]
    fn release_from_other_threads() {
        let pool = Arc::new(SyncObjectPool::<Payload>::new(true));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let object = pool.acquire_safely();
                let pool = pool.clone();
                thread::spawn(move || pool.release_safely(object))
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(pool.counts().created, 4);
        assert_eq!(pool.counts().resident, 4);
    }
}
