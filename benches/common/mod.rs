//! Shared data generators for the benchmarks, seeded so runs compare.

#![allow(dead_code)]

use atlas::Side;
use rand::Rng;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;

const SEED: u64 = 42;

/// Rows per hunk before a new header is started
const HUNK_ROWS: usize = 40;

pub fn seeded_rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(SEED)
}

/// A patch of `row_count` lines (headers included) with realistic hunk
/// headers: each hunk resumes a few lines after where the previous one ended.
pub fn generate_diff_patch(row_count: usize) -> String {
    let mut rng = seeded_rng();
    let mut rows = Vec::with_capacity(row_count);
    let mut body: Vec<String> = Vec::with_capacity(HUNK_ROWS);
    let (mut old, mut new) = (1u32, 1u32);

    let mut i = 0;
    while i < row_count {
        let take = HUNK_ROWS.min(row_count - i - 1);
        let (mut old_count, mut new_count) = (0u32, 0u32);
        body.clear();
        for n in 0..take {
            let content = generate_code_line(&mut rng, i + n);
            match rng.random_range(0..10u8) {
                0..=1 => {
                    new_count += 1;
                    body.push(format!("+{}", content));
                }
                2..=3 => {
                    old_count += 1;
                    body.push(format!("-{}", content));
                }
                _ => {
                    old_count += 1;
                    new_count += 1;
                    body.push(format!(" {}", content));
                }
            }
        }
        rows.push(format!("@@ -{},{} +{},{} @@", old, old_count, new, new_count));
        rows.append(&mut body);

        let gap = rng.random_range(3..20u32);
        old += old_count + gap;
        new += new_count + gap;
        i += take + 1;
    }

    rows.join("\n")
}

fn generate_code_line(rng: &mut ChaCha8Rng, row: usize) -> String {
    let templates = [
        "  const total = items.reduce((sum, item) => sum + item.value, 0);",
        "  async getMetrics(@Query() query: MetricsQuery) {",
        "  }",
        "    if (!user) { throw new UnauthorizedException(); }",
        "    for (const entry of entries) {",
        "    return this.service.find(id);",
        "  @Get(':id')",
        "import { Injectable } from '@nestjs/common';",
        "export class MetricsController {",
        "    // cache lookups per request",
        "    expect(result).toEqual(expected);",
        "    logger.debug(`fetched ${rows.length} rows`);",
    ];

    let idx = rng.random_range(0..templates.len());
    format!("{} // row {}", templates[idx], row)
}

/// One context hunk after another, without randomness.
pub fn generate_simple_patch(row_count: usize) -> String {
    let mut rows = Vec::with_capacity(row_count);
    let mut start = 1;

    for i in 0..row_count {
        if i % HUNK_ROWS == 0 {
            rows.push(format!("@@ -{start},{HUNK_ROWS} +{start},{HUNK_ROWS} @@"));
            start += HUNK_ROWS * 2;
            continue;
        }
        rows.push(format!(" plain line {}", i));
    }

    rows.join("\n")
}

/// Review-comment anchors spread over both sides; some fall outside the patch.
pub fn generate_anchors(count: usize, max_line: u32) -> Vec<(Side, u32)> {
    let mut rng = seeded_rng();
    (0..count)
        .map(|_| {
            let side = if rng.random_bool(0.3) { Side::Left } else { Side::Right };
            (side, rng.random_range(1..=max_line))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_generate_diff_patch_length() {
        let patch = super::generate_diff_patch(100);
        assert_eq!(patch.lines().count(), 100);
    }

    #[test]
    fn test_generate_diff_patch_reproducible() {
        assert_eq!(super::generate_diff_patch(50), super::generate_diff_patch(50));
    }

    #[test]
    fn test_generate_anchors_in_range() {
        let anchors = super::generate_anchors(200, 500);
        assert_eq!(anchors.len(), 200);
        assert!(anchors.iter().all(|(_, line)| (1..=500).contains(line)));
    }
}
