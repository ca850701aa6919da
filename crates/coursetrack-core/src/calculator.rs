//! Progress calculation.
//!
//! Pure functions over item completion state. Unreported items count as
//! incomplete, so a percentage computed before every item has reported is
//! a lower bound.

use coursetrack_models::{Completion, ContentItem, LearningItem, QuizItem, VideoItem};

/// Rounded percentage of completed items across all three categories.
///
/// Returns 0 for a module without items.
pub fn compute_percentage(contents: &[ContentItem], videos: &[VideoItem], quizzes: &[QuizItem]) -> u8 {
    let total = contents.len() + videos.len() + quizzes.len();
    let completed = completed_in(contents) + completed_in(videos) + completed_in(quizzes);
    percentage_of(completed, total)
}

/// `round(100 * completed / total)` with halves rounded up, 0 when `total` is 0.
pub fn percentage_of(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total) as u64;
    let total = total as u64;
    // Integer form of floor(100 * completed / total + 0.5).
    ((200 * completed + total) / (2 * total)) as u8
}

/// Module completion from the three category flags.
///
/// `Unknown` if any category is `Unknown`, otherwise the conjunction.
pub fn is_module_complete(content: Completion, video: Completion, test: Completion) -> Completion {
    Completion::all([content, video, test])
}

/// Completion of one category computed from its items.
///
/// `Unknown` until the listing has arrived and every item has reported.
/// An empty listed category is vacuously complete.
pub fn category_completion<T: LearningItem>(listed: bool, items: &[T]) -> Completion {
    if !listed {
        return Completion::Unknown;
    }
    Completion::all(items.iter().map(LearningItem::completion))
}

fn completed_in<T: LearningItem>(items: &[T]) -> usize {
    items.iter().filter(|i| i.is_completed()).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(states: &[bool]) -> Vec<ContentItem> {
        states
            .iter()
            .enumerate()
            .map(|(i, &done)| {
                let mut item = ContentItem::new(format!("c{}", i), "m1");
                item.is_completed = done;
                item.reported = true;
                item
            })
            .collect()
    }

    fn videos(states: &[bool]) -> Vec<VideoItem> {
        states
            .iter()
            .enumerate()
            .map(|(i, &done)| {
                let mut item = VideoItem::new(format!("v{}", i), "m1");
                item.is_completed = done;
                item.reported = true;
                item
            })
            .collect()
    }

    fn quizzes(states: &[bool]) -> Vec<QuizItem> {
        states
            .iter()
            .enumerate()
            .map(|(i, &done)| {
                let mut item = QuizItem::new(format!("q{}", i), "m1");
                item.is_completed = done;
                item.reported = true;
                item
            })
            .collect()
    }

    #[test]
    fn test_empty_module_is_zero() {
        assert_eq!(compute_percentage(&[], &[], &[]), 0);
    }

    #[test]
    fn test_quarter() {
        let p = compute_percentage(
            &contents(&[true, false]),
            &videos(&[false]),
            &quizzes(&[false]),
        );
        assert_eq!(p, 25);
    }

    #[test]
    fn test_all_complete() {
        let p = compute_percentage(&contents(&[true]), &videos(&[true]), &quizzes(&[true]));
        assert_eq!(p, 100);
    }

    #[test]
    fn test_rounding() {
        assert_eq!(percentage_of(1, 3), 33);
        assert_eq!(percentage_of(2, 3), 67);
        assert_eq!(percentage_of(1, 8), 13); // 12.5 rounds up
        assert_eq!(percentage_of(1, 200), 1); // 0.5 rounds up
        assert_eq!(percentage_of(1, 201), 0);
    }

    #[test]
    fn test_formula_over_counts() {
        for total in 1..=40usize {
            for completed in 0..=total {
                let expected = (100.0 * completed as f64 / total as f64).round() as u8;
                let actual = percentage_of(completed, total);
                assert_eq!(actual, expected, "{}/{}", completed, total);
                assert!(actual <= 100);
            }
        }
    }

    #[test]
    fn test_module_complete_truth_table() {
        use Completion::*;
        assert_eq!(is_module_complete(Known(true), Known(true), Known(true)), Known(true));
        assert_eq!(is_module_complete(Known(true), Known(false), Known(true)), Known(false));
        assert_eq!(is_module_complete(Known(true), Unknown, Known(true)), Unknown);
        assert_eq!(is_module_complete(Known(false), Unknown, Known(false)), Unknown);
    }

    #[test]
    fn test_category_completion() {
        assert_eq!(category_completion::<ContentItem>(false, &[]), Completion::Unknown);
        assert_eq!(category_completion::<ContentItem>(true, &[]), Completion::COMPLETE);
        assert_eq!(category_completion(true, &contents(&[true, true])), Completion::COMPLETE);
        assert_eq!(category_completion(true, &contents(&[true, false])), Completion::INCOMPLETE);

        let mut pending = contents(&[true]);
        pending.push(ContentItem::new("c9", "m1"));
        assert_eq!(category_completion(true, &pending), Completion::Unknown);
    }
}
