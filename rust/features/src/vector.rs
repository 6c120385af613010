// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fitting feature vectors to a model's expected input width.

/// Zero-pad on the right or truncate on the right to `width`
pub fn fit_to_width(vector: &[f64], width: usize) -> Vec<f64> {
    if vector.len() != width {
        tracing::debug!(
            features = vector.len(),
            expected = width,
            "Fitting feature vector to model width"
        );
    }
    let mut fitted: Vec<f64> = vector.iter().copied().take(width).collect();
    fitted.resize(width, 0.0);
    fitted
}
