use super::frame::Frame;
use crate::tools::{VideoInfo, get_video_info};
use anyhow::{Context, Result, bail};
use log::{debug, warn};
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};

/// 解碼選項
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodeOptions {
    /// 取樣間隔：只有 `index % stride == 0` 的影格需要完整解碼
    pub stride: u64,
    pub resize_factor: f64,
}

/// 逐幀讀取影片
pub trait FrameSource {
    /// 前進一幀但不輸出畫面
    fn grab(&mut self) -> Result<()>;

    /// 解碼下一個取樣影格，串流結束時回傳 `None`
    fn read(&mut self) -> Result<Option<Frame>>;
}

/// 影片讀取與剪輯的外部協作者
pub trait MediaBackend: Send + Sync {
    fn probe(&self, path: &Path) -> Result<VideoInfo>;

    fn open(
        &self,
        path: &Path,
        info: &VideoInfo,
        options: &DecodeOptions,
    ) -> Result<Box<dyn FrameSource>>;

    /// 將 `[start_seconds, end_seconds]` 輸出為獨立影片
    fn cut(
        &self,
        source: &Path,
        start_seconds: f64,
        end_seconds: f64,
        output: &Path,
    ) -> Result<()>;
}

/// 以 ffprobe / ffmpeg 子程序實作的媒體後端
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegBackend;

impl MediaBackend for FfmpegBackend {
    fn probe(&self, path: &Path) -> Result<VideoInfo> {
        get_video_info(path)
    }

    fn open(
        &self,
        path: &Path,
        info: &VideoInfo,
        options: &DecodeOptions,
    ) -> Result<Box<dyn FrameSource>> {
        let source = FfmpegFrameSource::spawn(path, info, options)?;
        Ok(Box::new(source))
    }

    fn cut(
        &self,
        source: &Path,
        start_seconds: f64,
        end_seconds: f64,
        output: &Path,
    ) -> Result<()> {
        let args = build_cut_args(source, start_seconds, end_seconds, output);
        debug!("執行剪輯: ffmpeg {}", args.join(" "));

        let result = Command::new("ffmpeg")
            .args(&args)
            .output()
            .with_context(|| format!("無法執行 ffmpeg 剪輯: {}", source.display()))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            bail!("ffmpeg 剪輯失敗: {}", stderr.trim());
        }

        if !output.exists() {
            bail!("剪輯檔案未建立: {}", output.display());
        }

        Ok(())
    }
}

/// ffmpeg 以 rawvideo 管線輸出的影格來源
///
/// 取樣間隔交給 `select` 濾鏡處理，未取樣的影格不會經過管線，
/// 因此 `grab` 不需要讀取任何資料。
struct FfmpegFrameSource {
    child: Child,
    stdout: BufReader<ChildStdout>,
    width: u32,
    height: u32,
}

impl FfmpegFrameSource {
    fn spawn(path: &Path, info: &VideoInfo, options: &DecodeOptions) -> Result<Self> {
        let width = scaled_dimension(info.width, options.resize_factor);
        let height = scaled_dimension(info.height, options.resize_factor);
        let args = build_decode_args(path, width, height, options.stride);

        debug!("執行解碼: ffmpeg {}", args.join(" "));

        let mut command = Command::new("ffmpeg");
        command.args(&args);
        Self::start(command, width, height)
            .with_context(|| format!("無法啟動 ffmpeg 解碼: {}", path.display()))
    }

    fn start(mut command: Command, width: u32, height: u32) -> Result<Self> {
        let mut child = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow::anyhow!("無法取得 ffmpeg 標準輸出"))?;

        Ok(Self {
            child,
            stdout: BufReader::new(stdout),
            width,
            height,
        })
    }

    /// 管線已讀完，解碼程序異常結束時視為失敗以便下次重試
    fn finish(&mut self) -> Result<Option<Frame>> {
        let status = self.child.wait().context("無法取得 ffmpeg 結束狀態")?;
        if !status.success() {
            bail!("ffmpeg 解碼中途失敗（{status}）");
        }
        Ok(None)
    }
}

impl FrameSource for FfmpegFrameSource {
    fn grab(&mut self) -> Result<()> {
        Ok(())
    }

    fn read(&mut self) -> Result<Option<Frame>> {
        let frame_size = self.width as usize * self.height as usize * 3;
        let mut buffer = vec![0u8; frame_size];
        let mut filled = 0;

        while filled < frame_size {
            match self.stdout.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e).context("讀取 ffmpeg 影格失敗"),
            }
        }

        if filled == 0 {
            return self.finish();
        }
        if filled < frame_size {
            warn!("最後一個影格資料不完整（{filled}/{frame_size} bytes），略過");
            return self.finish();
        }

        Frame::new(self.width, self.height, buffer).map(Some)
    }
}

impl Drop for FfmpegFrameSource {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn scaled_dimension(value: u32, factor: f64) -> u32 {
    ((f64::from(value) * factor).round() as u32).max(1)
}

fn build_decode_args(path: &Path, width: u32, height: u32, stride: u64) -> Vec<String> {
    let scale = format!("scale={width}:{height}");
    let filter = if stride > 1 {
        format!("select=not(mod(n\\,{stride})),{scale}")
    } else {
        scale
    };

    vec![
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-i".to_string(),
        path.to_string_lossy().to_string(),
        "-an".to_string(),
        "-sn".to_string(),
        "-dn".to_string(),
        "-vf".to_string(),
        filter,
        "-fps_mode".to_string(),
        "passthrough".to_string(),
        "-f".to_string(),
        "rawvideo".to_string(),
        "-pix_fmt".to_string(),
        "rgb24".to_string(),
        "-".to_string(),
    ]
}

fn build_cut_args(source: &Path, start_seconds: f64, end_seconds: f64, output: &Path) -> Vec<String> {
    let duration = (end_seconds - start_seconds).max(0.0);

    vec![
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-ss".to_string(),
        format!("{start_seconds:.3}"),
        "-i".to_string(),
        source.to_string_lossy().to_string(),
        "-t".to_string(),
        format!("{duration:.3}"),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-preset".to_string(),
        "ultrafast".to_string(),
        "-tune".to_string(),
        "fastdecode".to_string(),
        "-threads".to_string(),
        "2".to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        "-y".to_string(),
        output.to_string_lossy().to_string(),
    ]
}
