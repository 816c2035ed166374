use emotune_vision::smoothing::{SmoothingWindow, WindowState};
use emotune_vision::PredictionVector;
use rand::Rng;

fn v(scores: &[f32]) -> PredictionVector {
    PredictionVector::new(scores.to_vec())
}

#[test]
fn test_documented_eviction_scenario() {
    let mut window = SmoothingWindow::new(3);
    window.push(v(&[1.0, 0.0])).unwrap();
    window.push(v(&[0.0, 1.0])).unwrap();
    window.push(v(&[0.0, 1.0])).unwrap();
    let smoothed = window.push(v(&[0.0, 1.0])).unwrap();

    assert_eq!(window.len(), 3);
    assert_eq!(window.state(), WindowState::Full);
    assert_eq!(smoothed, v(&[0.0, 1.0]));
}

#[test]
fn test_mean_of_random_pushes() {
    let mut rng = rand::thread_rng();
    let capacity = 5;
    let classes = 7;

    for _ in 0..20 {
        let mut window = SmoothingWindow::new(capacity);
        let mut pushed: Vec<Vec<f32>> = Vec::new();

        for _ in 0..12 {
            let scores: Vec<f32> = (0..classes).map(|_| rng.gen_range(0.0..1.0)).collect();
            pushed.push(scores.clone());
            let smoothed = window.push(PredictionVector::new(scores)).unwrap();

            let recent = &pushed[pushed.len().saturating_sub(capacity)..];
            assert!(window.len() <= capacity);
            assert_eq!(window.len(), recent.len());

            for (i, got) in smoothed.as_slice().iter().enumerate() {
                let expected: f32 =
                    recent.iter().map(|s| s[i]).sum::<f32>() / recent.len() as f32;
                assert!((got - expected).abs() < 1e-5, "class {i}: {got} vs {expected}");
            }
        }
    }
}

#[test]
fn test_clear_returns_to_empty() {
    let mut window = SmoothingWindow::new(2);
    window.push(v(&[0.5, 0.5])).unwrap();
    window.clear();
    assert_eq!(window.state(), WindowState::Empty);
    assert!(window.mean().is_empty());
}
