//! RGB空间的k-means聚类
//!
//! 质心在样本各通道的取值范围内随机放置；单次运行在质心最大位移小于
//! `epsilon` 或达到 `max_iterations` 时结束；重复 `attempts` 次，
//! 保留簇内平方距离和最小的一次。

use rand::Rng;

use crate::config::ColorConfig;

pub type Point = [f32; 3];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KMeans {
    pub k: usize,
    pub attempts: usize,
    pub max_iterations: usize,
    pub epsilon: f32,
}

/// 一次聚类的结果
#[derive(Debug, Clone, PartialEq)]
pub struct Clustering {
    pub centroids: Vec<Point>,
    /// 每个样本到其质心的平方距离之和
    pub compactness: f32,
}

impl From<&ColorConfig> for KMeans {
    fn from(config: &ColorConfig) -> Self {
        Self {
            k: config.cluster_count,
            attempts: config.attempts,
            max_iterations: config.max_iterations,
            epsilon: config.epsilon,
        }
    }
}

fn squared_distance(a: &Point, b: &Point) -> f32 {
    (a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)
}

fn nearest(point: &Point, centroids: &[Point]) -> (usize, f32) {
    let mut best = (0, f32::INFINITY);
    for (i, c) in centroids.iter().enumerate() {
        let d = squared_distance(point, c);
        if d < best.1 {
            best = (i, d);
        }
    }
    best
}

impl KMeans {
    /// 对样本聚类，返回 `k` 个质心；样本为空或 `k == 0` 时返回 `None`
    pub fn fit<R: Rng>(&self, points: &[Point], rng: &mut R) -> Option<Clustering> {
        if points.is_empty() || self.k == 0 {
            return None;
        }

        let mut best: Option<Clustering> = None;
        for _ in 0..self.attempts.max(1) {
            let run = self.run_once(points, rng);
            if best.as_ref().is_none_or(|b| run.compactness < b.compactness) {
                best = Some(run);
            }
        }
        best
    }

    fn run_once<R: Rng>(&self, points: &[Point], rng: &mut R) -> Clustering {
        let (lo, hi) = bounds(points);
        let mut centroids: Vec<Point> = (0..self.k)
            .map(|_| std::array::from_fn(|c| rng.random_range(lo[c]..=hi[c])))
            .collect();

        for _ in 0..self.max_iterations {
            let mut sums = vec![[0f64; 3]; self.k];
            let mut counts = vec![0usize; self.k];
            for p in points {
                let (i, _) = nearest(p, &centroids);
                for c in 0..3 {
                    sums[i][c] += p[c] as f64;
                }
                counts[i] += 1;
            }

            let mut shift = 0f32;
            for i in 0..self.k {
                // 空簇重新落到一个随机样本上
                let updated: Point = if counts[i] == 0 {
                    points[rng.random_range(0..points.len())]
                } else {
                    let n = counts[i] as f64;
                    std::array::from_fn(|c| (sums[i][c] / n) as f32)
                };
                shift = shift.max(squared_distance(&centroids[i], &updated).sqrt());
                centroids[i] = updated;
            }

            if shift < self.epsilon {
                break;
            }
        }

        let compactness = points.iter().map(|p| nearest(p, &centroids).1).sum();
        Clustering { centroids, compactness }
    }
}

fn bounds(points: &[Point]) -> (Point, Point) {
    let mut lo = [f32::INFINITY; 3];
    let mut hi = [f32::NEG_INFINITY; 3];
    for p in points {
        for c in 0..3 {
            lo[c] = lo[c].min(p[c]);
            hi[c] = hi[c].max(p[c]);
        }
    }
    (lo, hi)
}
