use assert_cmd::Command;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub const STACK_NAME: &str = "UatApplicationStack";
pub const VPC_ID: &str = "vpc-0123456789abcdef0";

/// サブネットまで明示したスタック定義
pub const FULL_STACK: &str = r#"
stack "UatApplicationStack" {
    account "123456789012"
    region "ap-south-1"
    application "sample-app"
    environment "uat"
}

network {
    vpc "vpc-0123456789abcdef0"
    security-group "ecs" "sg-0123456789abcdef0"
    security-group "alb" "sg-0fedcba9876543210"
    private-subnets "subnet-0aaaaaaaaaaaaaaaa" "subnet-0bbbbbbbbbbbbbbbb"
    public-subnets "subnet-0cccccccccccccccc" "subnet-0dddddddddddddddd"
}

lookups {
    repository "sample-api"
    log-group "/ecs/sample-api"
    certificate "arn:aws:acm:ap-south-1:123456789012:certificate/0f1e2d3c"
    machine-image "ami-0123456789abcdef0"
}
"#;

/// サブネットをコンテキストキャッシュに任せるスタック定義
pub const STACK_WITHOUT_SUBNETS: &str = r#"
stack "UatApplicationStack" {
    account "123456789012"
    region "ap-south-1"
}

network {
    vpc "vpc-0123456789abcdef0"
    security-group "ecs" "sg-0123456789abcdef0"
    security-group "alb" "sg-0fedcba9876543210"
}

lookups {
    repository "sample-api"
    log-group "/ecs/sample-api"
    certificate "arn:aws:acm:ap-south-1:123456789012:certificate/0f1e2d3c"
    machine-image "ami-0123456789abcdef0"
}
"#;

pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    pub fn with_stack(content: &str) -> Self {
        let project = Self::new();
        project.write_stack_kdl(content);
        project
    }

    pub fn write_stack_kdl(&self, content: &str) {
        let path = self.root.path().join("stack.kdl");
        fs::write(path, content).unwrap();
    }

    #[allow(dead_code)]
    pub fn write_context(&self, content: &str) {
        let dir = self.root.path().join(".stackflow");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("context.json"), content).unwrap();
    }

    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }

    pub fn out_dir(&self) -> PathBuf {
        self.path().join("stackflow.out")
    }

    #[allow(dead_code)]
    pub fn read_out(&self, file: &str) -> String {
        fs::read_to_string(self.out_dir().join(file)).unwrap()
    }

    /// プロジェクトルートで実行するコマンド（環境由来の設定は外す）
    #[allow(deprecated)]
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("stackflow").unwrap();
        cmd.current_dir(self.path())
            .env_remove("STACKFLOW_CONFIG_PATH")
            .env_remove("STACKFLOW_OUT_DIR")
            .env_remove("IMAGE_TAG")
            .env("NO_COLOR", "1");
        cmd
    }
}
