// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn factory_home_prefers_env_override() {
    // Serialize env mutation within this test only
    std::env::set_var("FACTORY_HOME", "/tmp/factory-test-home");
    let home = factory_home().unwrap();
    assert_eq!(home, PathBuf::from("/tmp/factory-test-home"));
    std::env::remove_var("FACTORY_HOME");
}
