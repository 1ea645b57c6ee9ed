//! The approximate Barnes-Hut octree acceleration kernel (C4).
//!
//! A cubic bounding box with `divide_into_octants`, and a tree built as an
//! arena of nodes with an explicit work stack rather than owned recursive
//! pointers. Nodes address children through a fixed `[i32; 8]` array (`-1` =
//! absent) and the tree is built directly from `&[Vec3]`/`&[f64]` slices.

use lin_alg::f64::Vec3;
use rayon::prelude::*;

use super::{check_finite, AccelKernel};
use crate::error::{Error, Result};

const NO_CHILD: i32 = -1;

/// A cubical bounding box: `center ± width/2` on every axis.
#[derive(Clone, Debug)]
pub struct Cube {
    pub center: Vec3,
    pub width: f64,
}

impl Cube {
    pub fn new(center: Vec3, width: f64) -> Self {
        Self { center, width }
    }

    /// Minimum cube that contains every body, optionally padded.
    pub fn from_bodies(r: &[Vec3], pad: f64) -> Option<Self> {
        if r.is_empty() {
            return None;
        }

        let mut x_min = f64::MAX;
        let mut x_max = f64::MIN;
        let mut y_min = f64::MAX;
        let mut y_max = f64::MIN;
        let mut z_min = f64::MAX;
        let mut z_max = f64::MIN;

        for p in r {
            x_min = x_min.min(p.x);
            x_max = x_max.max(p.x);
            y_min = y_min.min(p.y);
            y_max = y_max.max(p.y);
            z_min = z_min.min(p.z);
            z_max = z_max.max(p.z);
        }

        x_min -= pad;
        x_max += pad;
        y_min -= pad;
        y_max += pad;
        z_min -= pad;
        z_max += pad;

        let width = (x_max - x_min).max(y_max - y_min).max(z_max - z_min);
        let center = Vec3::new(
            (x_max + x_min) / 2.,
            (y_max + y_min) / 2.,
            (z_max + z_min) / 2.,
        );

        Some(Self::new(center, width))
    }

    fn contains(&self, p: Vec3) -> bool {
        let h = self.width / 2.;
        (p.x - self.center.x).abs() <= h
            && (p.y - self.center.y).abs() <= h
            && (p.z - self.center.z).abs() <= h
    }

    /// Divides this cube into its eight equal octants. Order matters: it is
    /// the order `octant_index` below addresses into.
    fn divide_into_octants(&self) -> [Self; 8] {
        let width = self.width / 2.;
        let wd2 = self.width / 4.;
        [
            Self::new(self.center + Vec3::new(-wd2, -wd2, -wd2), width),
            Self::new(self.center + Vec3::new(wd2, -wd2, -wd2), width),
            Self::new(self.center + Vec3::new(-wd2, wd2, -wd2), width),
            Self::new(self.center + Vec3::new(wd2, wd2, -wd2), width),
            Self::new(self.center + Vec3::new(-wd2, -wd2, wd2), width),
            Self::new(self.center + Vec3::new(wd2, -wd2, wd2), width),
            Self::new(self.center + Vec3::new(-wd2, wd2, wd2), width),
            Self::new(self.center + Vec3::new(wd2, wd2, wd2), width),
        ]
    }

    /// The 3-bit octant a point belongs to, relative to this cube's center.
    fn octant_of(&self, p: Vec3) -> usize {
        let mut index = 0;
        if p.x > self.center.x {
            index |= 0b001;
        }
        if p.y > self.center.y {
            index |= 0b010;
        }
        if p.z > self.center.z {
            index |= 0b100;
        }
        index
    }
}

/// Tree construction parameters. `max_tree_depth` bounds subdivision; bodies
/// still sharing a node at that depth are merged into a single leaf (see
/// DESIGN.md for the Open Question this resolves).
#[derive(Clone, Debug)]
pub struct BhConfig {
    pub max_tree_depth: usize,
}

impl Default for BhConfig {
    fn default() -> Self {
        Self { max_tree_depth: 15 }
    }
}

/// A node in the octree arena. Indexed by position in `Tree::nodes`;
/// `children[k] == -1` means that octant is empty.
#[derive(Debug)]
struct Node {
    bounding_box: Cube,
    children: [i32; 8],
    mass: f64,
    center_of_mass: Vec3,
    /// Non-empty only for leaves. More than one entry only when bodies were
    /// merged at `max_tree_depth`.
    body_ids: Vec<usize>,
    is_internal: bool,
}

/// The octree itself: an arena of nodes, rebuilt from scratch on every
/// acceleration evaluation and dropped as a unit afterward.
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn build(r: &[Vec3], m: &[f64], root: &Cube, config: &BhConfig) -> Result<Self> {
        for (i, &p) in r.iter().enumerate() {
            if !root.contains(p) {
                return Err(Error::Geometry(format!(
                    "particle {i} at {p:?} lies outside the root cube"
                )));
            }
        }

        let mut nodes = Vec::with_capacity(r.len() * 7 / 4 + 1);

        // Stack entries: (body indices in this subtree, bounding box, parent
        // node index, this node's octant slot in the parent, depth).
        let mut stack: Vec<(Vec<usize>, Cube, Option<(usize, usize)>, usize)> = Vec::new();
        let all_ids: Vec<usize> = (0..r.len()).collect();
        stack.push((all_ids, root.clone(), None, 0));

        while let Some((body_ids, bb, parent, depth)) = stack.pop() {
            let (center_of_mass, mass) = aggregate(&body_ids, r, m);
            let node_id = nodes.len();

            nodes.push(Node {
                bounding_box: bb.clone(),
                children: [NO_CHILD; 8],
                mass,
                center_of_mass,
                body_ids: Vec::new(),
                is_internal: false,
            });

            if let Some((parent_id, slot)) = parent {
                nodes[parent_id].children[slot] = node_id as i32;
            }

            if body_ids.len() > 1 && depth < config.max_tree_depth {
                nodes[node_id].is_internal = true;
                let octants = bb.divide_into_octants();
                let mut by_octant: [Vec<usize>; 8] = Default::default();
                for &id in &body_ids {
                    let slot = bb.octant_of(r[id]);
                    by_octant[slot].push(id);
                }
                for (slot, ids) in by_octant.into_iter().enumerate() {
                    if !ids.is_empty() {
                        stack.push((ids, octants[slot].clone(), Some((node_id, slot)), depth + 1));
                    }
                }
            } else {
                // Leaf: 0, 1, or (only once max_tree_depth is reached with
                // coincident points) several merged bodies.
                nodes[node_id].body_ids = body_ids;
            }
        }

        Ok(Self { nodes })
    }

    /// Accumulates the acceleration on `posit_target` (body `id_target`,
    /// excluded from self-interaction) by walking the tree with an explicit
    /// stack, applying the opening-angle acceptance rule at each node.
    fn acceleration_on(
        &self,
        posit_target: Vec3,
        id_target: usize,
        g: f64,
        eps_sq: f64,
        theta: f64,
    ) -> Vec3 {
        let mut acc = Vec3::new_zero();
        if self.nodes.is_empty() {
            return acc;
        }

        let mut stack = vec![0usize];
        while let Some(node_i) = stack.pop() {
            let node = &self.nodes[node_i];

            if !node.is_internal {
                if node.body_ids.contains(&id_target) || node.body_ids.is_empty() {
                    continue;
                }
                let diff = node.center_of_mass - posit_target;
                let dist_sq = diff.magnitude().powi(2);
                let denom = (dist_sq + eps_sq).powf(1.5);
                acc += diff * (g * node.mass / denom);
                continue;
            }

            let dist = (node.center_of_mass - posit_target).magnitude();
            if node.bounding_box.width / dist < theta {
                let diff = node.center_of_mass - posit_target;
                let dist_sq = dist * dist;
                let denom = (dist_sq + eps_sq).powf(1.5);
                acc += diff * (g * node.mass / denom);
            } else {
                for &child in &node.children {
                    if child != NO_CHILD {
                        stack.push(child as usize);
                    }
                }
            }
        }

        acc
    }
}

fn aggregate(ids: &[usize], r: &[Vec3], m: &[f64]) -> (Vec3, f64) {
    let mut mass = 0.;
    let mut com = Vec3::new_zero();
    for &id in ids {
        mass += m[id];
        com += r[id] * m[id];
    }
    if mass.abs() > f64::EPSILON {
        com /= mass;
    }
    (com, mass)
}

/// Builds the tree and computes per-body accelerations via the
/// multipole-acceptance traversal.
///
/// `theta == 0.` forces full descent to leaves on every traversal, recovering
/// `acc_bf`'s result modulo floating-point reduction order.
pub fn acc_bh(
    root: &Cube,
    r: &[Vec3],
    m: &[f64],
    g: f64,
    eps: f64,
    theta: f64,
    config: &BhConfig,
) -> Result<Vec<Vec3>> {
    if r.len() != m.len() {
        return Err(Error::InvalidInput(format!(
            "r and m must have equal length, got {} and {}",
            r.len(),
            m.len()
        )));
    }
    if eps < 0. {
        return Err(Error::InvalidInput(format!(
            "softening epsilon must be non-negative, got {eps}"
        )));
    }
    if theta < 0. {
        return Err(Error::InvalidInput(format!(
            "opening angle theta must be non-negative, got {theta}"
        )));
    }

    let tree = Tree::build(r, m, root, config)?;
    let eps_sq = eps * eps;

    let acc: Vec<Vec3> = r
        .par_iter()
        .enumerate()
        .map(|(i, &ri)| tree.acceleration_on(ri, i, g, eps_sq, theta))
        .collect();

    Ok(acc)
}

/// An [`AccelKernel`] wrapping [`acc_bh`], bound to the root cube, G, ε, θ,
/// and tree-construction parameters.
pub struct BarnesHutKernel {
    pub root: Cube,
    pub g: f64,
    pub eps: f64,
    pub theta: f64,
    pub config: BhConfig,
    pub detect_nonfinite: bool,
}

impl BarnesHutKernel {
    pub fn new(root: Cube, g: f64, eps: f64, theta: f64) -> Self {
        Self {
            root,
            g,
            eps,
            theta,
            config: BhConfig::default(),
            detect_nonfinite: true,
        }
    }
}

impl AccelKernel for BarnesHutKernel {
    fn compute(&self, r: &[Vec3], m: &[f64]) -> Result<Vec<Vec3>> {
        let acc = acc_bh(&self.root, r, m, self.g, self.eps, self.theta, &self.config)?;
        if self.detect_nonfinite {
            check_finite(&acc)?;
        }
        Ok(acc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::brute_force::acc_bf;
    use rand::{Rng, SeedableRng};
    use rand::rngs::StdRng;

    fn uniform_cuboid(n: usize, side: f64, seed: u64) -> (Vec<Vec3>, Vec<f64>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let r = (0..n)
            .map(|_| {
                Vec3::new(
                    rng.random_range(-side / 2.0..side / 2.0),
                    rng.random_range(-side / 2.0..side / 2.0),
                    rng.random_range(-side / 2.0..side / 2.0),
                )
            })
            .collect();
        let m = vec![1.0; n];
        (r, m)
    }

    fn relative_error(a: &[Vec3], reference: &[Vec3]) -> (f64, f64) {
        let errs: Vec<f64> = a
            .iter()
            .zip(reference)
            .map(|(x, r)| (*x - *r).magnitude() / r.magnitude())
            .collect();
        let mean = errs.iter().sum::<f64>() / errs.len() as f64;
        let var = errs.iter().map(|e| (e - mean).powi(2)).sum::<f64>() / errs.len() as f64;
        (mean, var.sqrt())
    }

    #[test]
    fn build_fails_when_particle_outside_root() {
        let root = Cube::new(Vec3::new_zero(), 1.0);
        let r = vec![Vec3::new(10., 10., 10.)];
        let m = vec![1.0];
        let err = acc_bh(&root, &r, &m, 1.0, 0., 0.5, &BhConfig::default());
        assert!(err.is_err());
    }

    #[test]
    fn theta_zero_matches_brute_force_exactly() {
        for &n in &[2usize, 10, 100, 1000, 5000, 10000] {
            let cube_length = (n as f64).sqrt().max(1.0);
            let (r, m) = uniform_cuboid(n, cube_length, 42 + n as u64);
            let root = Cube::from_bodies(&r, 0.5).unwrap();

            let exact = acc_bf(&r, &m, 1.0, 1e-3).unwrap();
            let tree = acc_bh(&root, &r, &m, 1.0, 1e-3, 0., &BhConfig::default()).unwrap();

            for (a, b) in tree.iter().zip(&exact) {
                let rel = (*a - *b).magnitude() / b.magnitude().max(1e-300);
                assert!(rel < 1e-10, "relative error {rel} too large at theta=0");
            }
        }
    }

    #[test]
    fn theta_half_is_close_to_brute_force() {
        for &n in &[2usize, 10, 100, 1000, 5000, 10000] {
            let cube_length = (n as f64).sqrt().max(1.0);
            let (r, m) = uniform_cuboid(n, cube_length, 100 + n as u64);
            let root = Cube::from_bodies(&r, 0.5).unwrap();

            let exact = acc_bf(&r, &m, 1.0, 1e-3).unwrap();
            let tree = acc_bh(&root, &r, &m, 1.0, 1e-3, 0.5, &BhConfig::default()).unwrap();

            let (mean, std) = relative_error(&tree, &exact);
            assert!(mean < 0.02, "mean relative error {mean} too large for n={n}");
            assert!(std < 0.02, "std of relative error {std} too large for n={n}");
        }
    }

    #[test]
    fn mass_dominated_system_centers_on_heavy_body() {
        let r = vec![
            Vec3::new(0., 0., 0.),
            Vec3::new(1., 0., 0.),
            Vec3::new(1., 1., 1.),
        ];
        let m = vec![1., 2., 1.0e15];
        let com = crate::physics::center_of_mass(&r, &m);
        assert!((com.x - 1.).abs() < 1e-10);
        assert!((com.y - 1.).abs() < 1e-10);
        assert!((com.z - 1.).abs() < 1e-10);
    }
}
