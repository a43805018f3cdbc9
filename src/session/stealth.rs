//! Basic fingerprint masking for the Chromium session.
//!
//! Only the baseline: automation-control blink feature off, a fixed desktop
//! user-agent, and a `navigator.webdriver` scrub after each navigation.
//! Adversarial countermeasures are out of scope.

/// Fixed desktop user-agent applied at launch.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Evaluated after every navigation.
pub const MASK_WEBDRIVER_JS: &str =
    "Object.defineProperty(navigator, 'webdriver', { get: () => undefined })";

/// Chromium launch arguments.
pub fn launch_args(headless: bool) -> Vec<String> {
    let mut args = vec![
        "--disable-blink-features=AutomationControlled".to_string(),
        "--no-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--disable-gpu".to_string(),
        "--window-size=1920,1080".to_string(),
        format!("--user-agent={USER_AGENT}"),
    ];
    if headless {
        args.push("--headless=new".to_string());
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_flag_only_when_requested() {
        assert!(launch_args(true).iter().any(|a| a == "--headless=new"));
        assert!(!launch_args(false).iter().any(|a| a.starts_with("--headless")));
    }

    #[test]
    fn test_masking_args_always_present() {
        for headless in [true, false] {
            let args = launch_args(headless);
            assert!(args.iter().any(|a| a.contains("AutomationControlled")));
            assert!(args.iter().any(|a| a.starts_with("--user-agent=")));
        }
    }
}
