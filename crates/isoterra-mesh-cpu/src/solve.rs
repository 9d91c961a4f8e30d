//! Vertex placement from the edge-crossing planes around a voxel.
//!
//! The scalar solve is the reference. The batched solve runs four voxels in
//! lock-step over fixed-width lane arrays so the compiler can vectorize it;
//! every lane performs the same operations in the same order as the scalar
//! path, which keeps the two numerically interchangeable.

use isoterra_geom::Vec3;

/// A voxel cube has twelve edges, so at most twelve crossings.
pub const MAX_PLANES: usize = 12;

/// Crossing points (voxel-local, in `[0,1]³`) and surface normals.
#[derive(Clone, Copy, Debug, Default)]
pub struct CrossingPlanes {
    p: [Vec3; MAX_PLANES],
    n: [Vec3; MAX_PLANES],
    len: usize,
}

impl CrossingPlanes {
    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
    }

    #[inline]
    pub fn push(&mut self, p: Vec3, n: Vec3) {
        debug_assert!(self.len < MAX_PLANES, "more than {MAX_PLANES} crossings");
        if self.len < MAX_PLANES {
            self.p[self.len] = p;
            self.n[self.len] = n;
            self.len += 1;
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn points(&self) -> &[Vec3] {
        &self.p[..self.len]
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.n[..self.len]
    }

    pub fn centroid(&self) -> Vec3 {
        if self.len == 0 {
            return Vec3::splat(0.5);
        }
        let mut c = Vec3::ZERO;
        for p in self.points() {
            c += *p;
        }
        c / self.len as f32
    }

    /// Normalized sum of the plane normals.
    pub fn average_normal(&self) -> Vec3 {
        let mut n = Vec3::ZERO;
        for v in self.normals() {
            n += *v;
        }
        n.safe_normalized()
    }
}

/// Relaxes the centroid toward every plane in turn for `iterations` sweeps,
/// then pulls the result `bias` of the way back to the centroid.
pub fn solve_scalar(planes: &CrossingPlanes, iterations: u32, bias: f32) -> Vec3 {
    if planes.is_empty() {
        return Vec3::splat(0.5);
    }
    let centroid = planes.centroid();
    let mut c = centroid;
    for _ in 0..iterations {
        for (p, n) in planes.points().iter().zip(planes.normals()) {
            let d = n.dot(*p - c);
            c += *n * (d * 0.5);
        }
    }
    c.lerp(centroid, bias)
}

pub const LANES: usize = 4;

#[cfg(feature = "batched_solver")]
type Lane = [f32; LANES];

#[cfg(feature = "batched_solver")]
#[derive(Default)]
struct LanePlanes {
    px: [Lane; MAX_PLANES],
    py: [Lane; MAX_PLANES],
    pz: [Lane; MAX_PLANES],
    nx: [Lane; MAX_PLANES],
    ny: [Lane; MAX_PLANES],
    nz: [Lane; MAX_PLANES],
}

/// Solves up to [`LANES`] plane sets at once. Missing or short lanes are
/// padded with zero normals, which leave the lane's estimate untouched.
#[cfg(feature = "batched_solver")]
pub fn solve_batched(batch: &[CrossingPlanes], iterations: u32, bias: f32) -> [Vec3; LANES] {
    debug_assert!(batch.len() <= LANES);
    let mut lp = LanePlanes::default();
    let mut cx: Lane = [0.5; LANES];
    let mut cy: Lane = [0.5; LANES];
    let mut cz: Lane = [0.5; LANES];
    let mut rounds = 0;
    for (l, planes) in batch.iter().take(LANES).enumerate() {
        let c = planes.centroid();
        cx[l] = c.x;
        cy[l] = c.y;
        cz[l] = c.z;
        for (j, (p, n)) in planes.points().iter().zip(planes.normals()).enumerate() {
            lp.px[j][l] = p.x;
            lp.py[j][l] = p.y;
            lp.pz[j][l] = p.z;
            lp.nx[j][l] = n.x;
            lp.ny[j][l] = n.y;
            lp.nz[j][l] = n.z;
        }
        rounds = rounds.max(planes.len());
    }
    let (bx, by, bz) = (cx, cy, cz);

    for _ in 0..iterations {
        for j in 0..rounds {
            for l in 0..LANES {
                let d = lp.nx[j][l] * (lp.px[j][l] - cx[l])
                    + lp.ny[j][l] * (lp.py[j][l] - cy[l])
                    + lp.nz[j][l] * (lp.pz[j][l] - cz[l]);
                let s = d * 0.5;
                cx[l] += lp.nx[j][l] * s;
                cy[l] += lp.ny[j][l] * s;
                cz[l] += lp.nz[j][l] * s;
            }
        }
    }

    let mut out = [Vec3::splat(0.5); LANES];
    for (l, o) in out.iter_mut().enumerate() {
        let c = Vec3::new(cx[l], cy[l], cz[l]);
        *o = c.lerp(Vec3::new(bx[l], by[l], bz[l]), bias);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planes(list: &[(Vec3, Vec3)]) -> CrossingPlanes {
        let mut p = CrossingPlanes::default();
        for (a, n) in list {
            p.push(*a, *n);
        }
        p
    }

    #[test]
    fn single_plane_keeps_centroid() {
        let p = planes(&[(Vec3::new(0.3, 1.0, 1.0), Vec3::new(1.0, 0.0, 0.0))]);
        let v = solve_scalar(&p, 10, 0.1);
        assert!((v - Vec3::new(0.3, 1.0, 1.0)).length() < 1e-5);
    }

    #[test]
    fn corner_of_three_planes_is_recovered() {
        let corner = Vec3::new(0.4, 0.6, 0.5);
        let p = planes(&[
            (Vec3::new(0.4, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0)),
            (Vec3::new(0.0, 0.6, 1.0), Vec3::new(0.0, 1.0, 0.0)),
            (Vec3::new(1.0, 1.0, 0.5), Vec3::new(0.0, 0.0, 1.0)),
        ]);
        let v = solve_scalar(&p, 40, 0.0);
        assert!((v - corner).length() < 1e-3, "{:?}", v);
    }

    #[test]
    fn empty_set_is_voxel_center() {
        assert_eq!(solve_scalar(&CrossingPlanes::default(), 10, 0.1), Vec3::splat(0.5));
    }

    #[cfg(feature = "batched_solver")]
    #[test]
    fn batched_matches_scalar_on_uneven_lanes() {
        let a = planes(&[(Vec3::new(0.2, 1.0, 1.0), Vec3::new(0.6, 0.8, 0.0))]);
        let b = planes(&[
            (Vec3::new(0.4, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0)),
            (Vec3::new(0.0, 0.6, 1.0), Vec3::new(0.0, 1.0, 0.0)),
        ]);
        let batch = [a, b];
        let out = solve_batched(&batch, 10, 0.1);
        for (i, p) in batch.iter().enumerate() {
            let s = solve_scalar(p, 10, 0.1);
            assert!((out[i] - s).length() < 1e-6);
        }
    }
}
