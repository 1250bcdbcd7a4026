//! 近似子串匹配
//!
//! 在 `haystack` 中寻找与 `needle` 编辑距离最小的子串（Sellers 算法：
//! 标准 Levenshtein 动态规划，但匹配可以从 `haystack` 的任意位置开始和结束）。
//! 比较时忽略大小写，下标按字符计数。

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuzzyMatch {
    /// 起始字符下标（包含）
    pub start: usize,
    /// 结束字符下标（不包含）
    pub end: usize,
    pub distance: usize,
}

impl FuzzyMatch {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

fn fold(text: &str) -> Vec<char> {
    text.chars()
        .map(|c| c.to_lowercase().next().unwrap_or(c))
        .collect()
}

/// 返回编辑距离不超过 `max_distance` 的最佳匹配
///
/// 距离更小者优先；距离相同时保留最早出现的区域，同一区域内取更长的跨度。
pub fn find_near_match(needle: &str, haystack: &str, max_distance: usize) -> Option<FuzzyMatch> {
    let needle = fold(needle);
    let haystack = fold(haystack);
    let m = needle.len();
    if m == 0 || haystack.is_empty() {
        return None;
    }

    if let Some(start) = haystack.windows(m).position(|window| window == needle.as_slice()) {
        return Some(FuzzyMatch {
            start,
            end: start + m,
            distance: 0,
        });
    }
    if max_distance == 0 {
        return None;
    }

    // 每个单元格保存 (编辑距离, 匹配起点)，元组比较时距离相同取更靠前的起点
    let mut prev: Vec<(usize, usize)> = (0..=m).map(|i| (i, 0)).collect();
    let mut cur: Vec<(usize, usize)> = vec![(0, 0); m + 1];
    let mut best: Option<FuzzyMatch> = None;

    for (j, &h) in haystack.iter().enumerate() {
        let j = j + 1;
        cur[0] = (0, j);
        for i in 1..=m {
            let substitute = (prev[i - 1].0 + usize::from(needle[i - 1] != h), prev[i - 1].1);
            let skip_needle = (cur[i - 1].0 + 1, cur[i - 1].1);
            let skip_haystack = (prev[i].0 + 1, prev[i].1);
            cur[i] = substitute.min(skip_needle).min(skip_haystack);
        }

        let (distance, start) = cur[m];
        if distance <= max_distance && start < j {
            let candidate = FuzzyMatch {
                start,
                end: j,
                distance,
            };
            let replace = match best {
                None => true,
                Some(current) => {
                    distance < current.distance
                        || (distance == current.distance && start <= current.start)
                }
            };
            if replace {
                best = Some(candidate);
            }
        }
        std::mem::swap(&mut prev, &mut cur);
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "The grass is green. The sky is blue.";

    #[test]
    fn test_exact_match() {
        assert_eq!(
            find_near_match("grass is green", DOC, 0),
            Some(FuzzyMatch {
                start: 4,
                end: 18,
                distance: 0
            })
        );
    }

    #[test]
    fn test_case_insensitive() {
        let found = find_near_match("THE SKY IS BLUE", DOC, 0).unwrap();
        assert_eq!((found.start, found.end), (20, 35));
    }

    #[test]
    fn test_typo_is_tolerated() {
        let found = find_near_match("the grass is gren", DOC, 2).unwrap();
        assert_eq!(found.distance, 1);
        assert_eq!(found.start, 0);
        assert_eq!(found.end, 18);
    }

    #[test]
    fn test_missing_word() {
        let found = find_near_match("The sky blue", DOC, 3).unwrap();
        assert_eq!(found.distance, 3);
        assert_eq!(found.start, 20);
        assert_eq!(found.end, 35);
    }

    #[test]
    fn test_no_match_within_distance() {
        assert_eq!(find_near_match("purple elephants", DOC, 3), None);
        assert_eq!(find_near_match("grass is gren", DOC, 0), None);
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(find_near_match("", DOC, 5), None);
        assert_eq!(find_near_match("grass", "", 5), None);
    }

    #[test]
    fn test_char_indices_for_unicode() {
        let found = find_near_match("café au lait", "J'aime le café au lait.", 0).unwrap();
        assert_eq!((found.start, found.end), (10, 22));
        assert_eq!(found.len(), 12);
    }

    #[test]
    fn test_prefers_first_region() {
        let found = find_near_match("blue", "blue sky, blue sea", 1).unwrap();
        assert_eq!((found.start, found.end, found.distance), (0, 4, 0));
        let found = find_near_match("bluu", "blue sky, blue sea", 1).unwrap();
        assert_eq!(found.start, 0);
    }
}
