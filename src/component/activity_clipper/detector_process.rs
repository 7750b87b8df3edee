use super::frame::Frame;
use super::object_detector::{Detection, ObjectDetector};
use crate::config::DetectorSettings;
use anyhow::{Context, Result, anyhow, bail};
use log::{info, warn};
use serde::Deserialize;
use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::Mutex;

#[derive(Debug, Deserialize)]
struct Handshake {
    ready: bool,
    #[serde(default)]
    accelerated: bool,
}

#[derive(Debug, Deserialize)]
struct DetectResponse {
    #[serde(default)]
    detections: Vec<Detection>,
    error: Option<String>,
}

struct DetectorPipe {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl DetectorPipe {
    fn send_line(&mut self, value: &serde_json::Value) -> Result<()> {
        writeln!(self.stdin, "{value}").context("無法寫入偵測程序")
    }

    fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let read = self
            .stdout
            .read_line(&mut line)
            .context("無法讀取偵測程序輸出")?;
        if read == 0 {
            bail!("偵測程序已結束");
        }
        Ok(line)
    }
}

// 握手失敗或偵測器釋放時都要結束子程序
impl Drop for DetectorPipe {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// 以外部程序執行物件偵測模型
///
/// 協定為逐行 JSON：啟動後程序先回覆 `{"ready":true,"accelerated":bool}`；
/// 每個請求是一行標頭接著 `width * height * 3` bytes 的 RGB 資料，
/// 程序回覆一行 `{"detections":[...]}` 或 `{"error":"..."}`。
pub struct CommandDetector {
    pipe: Mutex<DetectorPipe>,
    accelerated: bool,
}

impl CommandDetector {
    /// 啟動偵測程序並完成握手，任何失敗都視為無法初始化
    pub fn spawn(settings: &DetectorSettings) -> Result<Self> {
        let command = settings
            .command
            .as_deref()
            .ok_or_else(|| anyhow!("未設定偵測程序指令"))?;

        let mut child = Command::new(command)
            .args(&settings.args)
            .arg("--model")
            .arg(&settings.model)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("無法啟動偵測程序: {command}"))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("無法取得偵測程序標準輸入"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("無法取得偵測程序標準輸出"))?;

        let mut pipe = DetectorPipe {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        };

        let line = pipe.read_line().context("偵測程序未完成握手")?;
        let handshake: Handshake = serde_json::from_str(line.trim())
            .with_context(|| format!("偵測程序握手格式錯誤: {}", line.trim()))?;
        if !handshake.ready {
            bail!("偵測程序回報尚未就緒");
        }

        info!(
            "偵測程序已啟動: {command}（模型 {}，硬體加速: {}）",
            settings.model, handshake.accelerated
        );

        Ok(Self {
            pipe: Mutex::new(pipe),
            accelerated: handshake.accelerated,
        })
    }
}

impl ObjectDetector for CommandDetector {
    fn detect(&self, frame: &Frame) -> Result<Vec<Detection>> {
        let mut pipe = self
            .pipe
            .lock()
            .map_err(|_| anyhow!("偵測程序鎖已失效"))?;

        pipe.send_line(&json!({
            "op": "detect",
            "width": frame.width,
            "height": frame.height,
            "channels": 3,
        }))?;
        pipe.stdin
            .write_all(&frame.data)
            .context("無法傳送影格給偵測程序")?;
        pipe.stdin.flush().context("無法傳送影格給偵測程序")?;

        let line = pipe.read_line()?;
        let response: DetectResponse = serde_json::from_str(line.trim())
            .with_context(|| format!("偵測程序回應格式錯誤: {}", line.trim()))?;

        if let Some(message) = response.error {
            bail!("偵測程序回報錯誤: {message}");
        }
        Ok(response.detections)
    }

    fn uses_hardware_acceleration(&self) -> bool {
        self.accelerated
    }

    fn release_cached_memory(&self) {
        let Ok(mut pipe) = self.pipe.lock() else {
            return;
        };
        if let Err(e) = pipe.send_line(&json!({ "op": "release_cache" })) {
            warn!("無法要求偵測程序釋放快取: {e}");
        }
    }
}
