use std::{borrow::Borrow, collections::HashMap, hash::Hash};

use thiserror::Error;

pub type ScopeId = u32;

#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum ScopeError {
    #[error("The stack is empty")]
    EmptyStack,

    #[error("Key is already bound in the target frame")]
    AlreadyBound,
}

#[derive(Clone, Debug)]
struct Frame<K, V> {
    id: ScopeId,
    bindings: HashMap<K, V>,
}

impl<K, V> Frame<K, V> {
    fn new(id: ScopeId) -> Self {
        Frame {
            id,
            bindings: HashMap::new(),
        }
    }
}

/// Stack of id-tagged frames. The bottom frame is permanent.
///
/// Frames that share the id of the top frame form one "activation": lookups
/// see all of them at once, then fall through to the bottom frame.
#[derive(Clone, Debug)]
pub struct ScopeStack<K, V> {
    frames: Vec<Frame<K, V>>,
}

impl<K: Eq + Hash, V> ScopeStack<K, V> {
    pub fn new(root: ScopeId) -> Self {
        ScopeStack {
            frames: vec![Frame::new(root)],
        }
    }

    pub fn push(&mut self, id: ScopeId) {
        self.frames.push(Frame::new(id));
    }

    /// Pops the top frame. The bottom frame is never removed.
    pub fn pop(&mut self) -> bool {
        if self.frames.len() <= 1 {
            return false;
        }

        self.frames.pop();
        true
    }

    pub fn current_id(&self) -> ScopeId {
        self.top().id
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn insert_root(&mut self, k: K, v: V) -> Result<(), ScopeError> {
        let frame = self.frames.first_mut().ok_or(ScopeError::EmptyStack)?;
        Self::insert_into(frame, k, v)
    }

    pub fn insert_top(&mut self, k: K, v: V) -> Result<(), ScopeError> {
        let frame = self.frames.last_mut().ok_or(ScopeError::EmptyStack)?;
        Self::insert_into(frame, k, v)
    }

    fn insert_into(frame: &mut Frame<K, V>, k: K, v: V) -> Result<(), ScopeError> {
        if frame.bindings.contains_key(&k) {
            return Err(ScopeError::AlreadyBound);
        }

        frame.bindings.insert(k, v);
        Ok(())
    }

    pub fn get_root<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.frames.first().and_then(|f| f.bindings.get(key))
    }

    pub fn get_root_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.frames.first_mut().and_then(|f| f.bindings.get_mut(key))
    }

    /// Looks only at the frames belonging to the current activation.
    pub fn get_in_activation<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let current = self.current_id();

        self.frames
            .iter()
            .rev()
            .take_while(|frame| frame.id == current)
            .find_map(|frame| frame.bindings.get(key))
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.get_in_activation(key).or_else(|| self.get_root(key))
    }

    fn top(&self) -> &Frame<K, V> {
        // the root frame is never popped
        &self.frames[self.frames.len() - 1]
    }
}
