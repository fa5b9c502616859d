use crate::render::PreparedMesh;

/// Index of a mesh owned by a `MeshArena`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct MeshHandle(u32);

/// Arena of chunk meshes with recycle lists keyed by capacity tier.
///
/// Tier `t` holds meshes with room for `min_quads << t` quads. Released meshes are
/// cleared and pooled until `max_pooled` are waiting; past that they are dropped.
#[derive(Debug)]
pub struct MeshArena {
    slots: Vec<Option<Mesh>>,
    vacant: Vec<u32>,
    free: Vec<Vec<MeshHandle>>,
    pooled: usize,
    max_pooled: usize,
    min_quads: usize,
}

#[derive(Debug)]
struct Mesh {
    mesh: PreparedMesh,
    tier: usize,
    in_use: bool,
}

impl MeshArena {
    pub fn new(min_quads: usize, max_pooled: usize) -> Self {
        Self {
            slots: Vec::new(),
            vacant: Vec::new(),
            free: Vec::new(),
            pooled: 0,
            max_pooled,
            min_quads: min_quads.max(1),
        }
    }

    /// Smallest tier holding `quads`.
    pub fn tier_for(&self, quads: usize) -> usize {
        let mut tier = 0;
        while self.tier_quads(tier) < quads {
            tier += 1;
        }
        tier
    }

    #[inline]
    pub fn tier_quads(&self, tier: usize) -> usize {
        self.min_quads << tier
    }

    /// Hands out an empty mesh with room for at least `quads` quads, recycled when
    /// the tier has one pooled.
    pub fn acquire(&mut self, quads: usize) -> MeshHandle {
        let tier = self.tier_for(quads);
        if let Some(handle) = self.free.get_mut(tier).and_then(Vec::pop) {
            self.pooled -= 1;
            if let Some(m) = self.slot_mut(handle) {
                m.in_use = true;
            }
            return handle;
        }

        let mesh = Mesh {
            mesh: PreparedMesh::with_quad_capacity(self.tier_quads(tier)),
            tier,
            in_use: true,
        };
        match self.vacant.pop() {
            Some(i) => {
                self.slots[i as usize] = Some(mesh);
                MeshHandle(i)
            }
            None => {
                self.slots.push(Some(mesh));
                MeshHandle(self.slots.len() as u32 - 1)
            }
        }
    }

    /// Returns a mesh to the pool, or drops it when the pool is full. Returns `true`
    /// when pooled.
    pub fn release(&mut self, handle: MeshHandle) -> bool {
        let full = self.pooled >= self.max_pooled;
        let Some(m) = self.slot_mut(handle) else {
            log::error!("mesh arena: release of unknown {handle:?}");
            return false;
        };
        if !m.in_use {
            log::error!("mesh arena: double release of {handle:?}");
            return false;
        }

        if full {
            self.slots[handle.0 as usize] = None;
            self.vacant.push(handle.0);
            return false;
        }

        m.mesh.clear();
        m.in_use = false;
        let tier = m.tier;
        if self.free.len() <= tier {
            self.free.resize_with(tier + 1, Vec::new);
        }
        self.free[tier].push(handle);
        self.pooled += 1;
        true
    }

    pub fn get(&self, handle: MeshHandle) -> Option<&PreparedMesh> {
        match self.slots.get(handle.0 as usize)? {
            Some(m) if m.in_use => Some(&m.mesh),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, handle: MeshHandle) -> Option<&mut PreparedMesh> {
        self.slot_mut(handle).filter(|m| m.in_use).map(|m| &mut m.mesh)
    }

    /// Quad capacity of the tier `handle` was allocated for.
    pub fn capacity(&self, handle: MeshHandle) -> usize {
        match self.slots.get(handle.0 as usize) {
            Some(Some(m)) => self.tier_quads(m.tier),
            _ => 0,
        }
    }

    /// Meshes waiting in the recycle lists.
    #[inline]
    pub fn pooled(&self) -> usize {
        self.pooled
    }

    /// Meshes currently handed out.
    pub fn in_use(&self) -> usize {
        self.slots.iter().flatten().filter(|m| m.in_use).count()
    }

    fn slot_mut(&mut self, handle: MeshHandle) -> Option<&mut Mesh> {
        self.slots.get_mut(handle.0 as usize)?.as_mut()
    }
}
