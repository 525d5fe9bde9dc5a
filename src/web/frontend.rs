//! Embedded HTML/CSS/JS frontend for the convopt web page.
//!
//! The entire SPA is compiled into the binary as a string constant.
//! Nothing is loaded from outside the binary.

/// The complete single-page UI.
pub const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>convopt: Conversion Copy Optimizer</title>
<style>
:root {
  --bg: #f6f8fb;
  --surface: #ffffff;
  --border: #dde3ec;
  --text: #1f2933;
  --text-muted: #6b7785;
  --accent: #3b5bdb;
  --green: #2f9e44;
  --yellow: #e8a317;
  --orange: #e8590c;
  --red: #e03131;
  --radius: 8px;
  --font: -apple-system, BlinkMacSystemFont, 'Segoe UI', Helvetica, Arial, sans-serif;
}

* { margin: 0; padding: 0; box-sizing: border-box; }
body {
  background: var(--bg);
  color: var(--text);
  font-family: var(--font);
  font-size: 14px;
  line-height: 1.5;
}

.app { max-width: 1100px; margin: 0 auto; padding: 24px; }

header { margin-bottom: 20px; }
header h1 { font-size: 24px; font-weight: 700; color: var(--accent); }
header .subtitle { color: var(--text-muted); }

nav.tabs {
  display: grid;
  grid-template-columns: repeat(4, 1fr);
  background: var(--surface);
  border: 1px solid var(--border);
  border-radius: var(--radius);
  overflow: hidden;
  margin-bottom: 20px;
}
nav.tabs button {
  border: none;
  background: transparent;
  padding: 10px;
  font: inherit;
  cursor: pointer;
  color: var(--text-muted);
}
nav.tabs button.active { background: var(--accent); color: #fff; }

section.tab { display: none; }
section.tab.active { display: block; }

.card {
  background: var(--surface);
  border: 1px solid var(--border);
  border-radius: var(--radius);
  padding: 18px;
  margin-bottom: 16px;
}
.card h2 { font-size: 16px; margin-bottom: 4px; }
.card .hint { color: var(--text-muted); margin-bottom: 12px; }

label { display: block; font-weight: 600; margin: 10px 0 4px; }
input[type=text], input[type=password], textarea {
  width: 100%;
  padding: 8px;
  border: 1px solid var(--border);
  border-radius: 6px;
  font: inherit;
}
textarea { min-height: 110px; resize: vertical; }

.row { display: flex; gap: 10px; align-items: center; margin-top: 12px; flex-wrap: wrap; }
button.primary, button.secondary {
  border: 1px solid var(--accent);
  border-radius: 6px;
  padding: 8px 14px;
  font: inherit;
  cursor: pointer;
}
button.primary { background: var(--accent); color: #fff; }
button.secondary { background: #fff; color: var(--accent); }
button:disabled { opacity: 0.5; cursor: wait; }

.badge { display: inline-block; padding: 2px 8px; border-radius: 10px; font-size: 12px; color: #fff; }
.badge.high { background: var(--green); }
.badge.low { background: var(--red); }

.sample {
  display: flex;
  justify-content: space-between;
  gap: 10px;
  padding: 10px;
  border: 1px solid var(--border);
  border-radius: 6px;
  margin-top: 8px;
}
.sample .text { white-space: pre-wrap; flex: 1; }
.sample .meta { color: var(--text-muted); font-size: 12px; }
.sample button { border: none; background: none; color: var(--red); cursor: pointer; }

.grid { display: grid; grid-template-columns: 1fr 1fr; gap: 16px; }
ul.items { padding-left: 18px; }
ul.items li { margin: 4px 0; }

.score { font-size: 40px; font-weight: 700; }
.score.excellent { color: var(--green); }
.score.good { color: var(--accent); }
.score.fair { color: var(--yellow); }
.score.poor { color: var(--red); }
.optimized { white-space: pre-wrap; background: var(--bg); padding: 12px; border-radius: 6px; }

.empty { color: var(--text-muted); text-align: center; padding: 30px 0; }

#toast {
  position: fixed;
  right: 20px;
  bottom: 20px;
  padding: 10px 14px;
  border-radius: 6px;
  color: #fff;
  display: none;
  max-width: 420px;
}
#toast.ok { background: var(--green); display: block; }
#toast.err { background: var(--red); display: block; }
</style>
</head>
<body>
<div class="app">
  <header>
    <h1>Conversion Copy Optimizer</h1>
    <div class="subtitle">Compare high- and low-converting copy, extract what makes the difference, and optimize new copy with AI.</div>
  </header>

  <nav class="tabs">
    <button data-tab="settings">API settings</button>
    <button data-tab="samples" class="active">Samples</button>
    <button data-tab="analysis">Feature analysis</button>
    <button data-tab="optimize">Optimization</button>
  </nav>

  <!-- API settings -->
  <section class="tab" id="tab-settings">
    <div class="card">
      <h2>API settings</h2>
      <div class="hint">Any OpenAI-compatible chat-completions endpoint. Settings are stored locally.</div>
      <label for="apiUrl">Endpoint URL</label>
      <input type="text" id="apiUrl">
      <label for="apiKey">API key</label>
      <input type="password" id="apiKey">
      <label for="model">Model</label>
      <input type="text" id="model">
      <div class="row">
        <button class="primary" id="saveConfig">Save</button>
        <button class="secondary" id="testConfig">Test connection</button>
        <span id="connStatus" class="hint"></span>
      </div>
    </div>
  </section>

  <!-- Samples -->
  <section class="tab active" id="tab-samples">
    <div class="card">
      <h2>Add a copy sample</h2>
      <div class="hint">Paste historical copy and label its conversion tier. 3–5 samples per tier give better results.</div>
      <label for="sampleContent">Copy</label>
      <textarea id="sampleContent" placeholder="Paste your historical copy..."></textarea>
      <label>Conversion tier</label>
      <div class="row">
        <label><input type="radio" name="label" value="high" checked> High-converting</label>
        <label><input type="radio" name="label" value="low"> Low-converting</label>
      </div>
      <div class="row"><button class="primary" id="addSample">Add sample</button></div>
    </div>
    <div class="card">
      <h2>Samples
        <span class="badge high" id="countHigh">high: 0</span>
        <span class="badge low" id="countLow">low: 0</span>
      </h2>
      <div id="sampleList"></div>
      <div class="row"><button class="primary" id="runAnalysis">Analyze features</button></div>
    </div>
  </section>

  <!-- Analysis -->
  <section class="tab" id="tab-analysis">
    <div id="analysisView"></div>
  </section>

  <!-- Optimization -->
  <section class="tab" id="tab-optimize">
    <div id="optimizeGate"></div>
    <div id="optimizeForm" style="display:none">
      <div class="card">
        <h2>Copy to optimize</h2>
        <textarea id="optimizeContent" placeholder="Paste the copy you want to improve..."></textarea>
        <div class="row"><button class="primary" id="runOptimize">Optimize</button></div>
      </div>
      <div id="optimizeView"></div>
    </div>
  </section>
</div>
<div id="toast"></div>

<script>
const $ = (id) => document.getElementById(id);
let analysis = null;

function toast(msg, ok) {
  const t = $('toast');
  t.textContent = msg;
  t.className = ok ? 'ok' : 'err';
  clearTimeout(t._timer);
  t._timer = setTimeout(() => { t.className = ''; }, 4000);
}

async function api(method, path, body) {
  const opts = { method, headers: { 'Content-Type': 'application/json' } };
  if (body !== undefined) opts.body = JSON.stringify(body);
  const res = await fetch(path, opts);
  const data = await res.json();
  if (!res.ok) {
    const err = new Error(data.error || ('HTTP ' + res.status));
    err.kind = data.kind;
    throw err;
  }
  return data;
}

async function busy(button, fn) {
  button.disabled = true;
  try { await fn(); } finally { button.disabled = false; }
}

function el(tag, cls, text) {
  const e = document.createElement(tag);
  if (cls) e.className = cls;
  if (text !== undefined) e.textContent = text;
  return e;
}

function listCard(title, items) {
  const card = el('div', 'card');
  card.appendChild(el('h2', null, title));
  const ul = el('ul', 'items');
  items.forEach((item) => ul.appendChild(el('li', null, item)));
  card.appendChild(ul);
  return card;
}

function showTab(name) {
  document.querySelectorAll('nav.tabs button').forEach((b) =>
    b.classList.toggle('active', b.dataset.tab === name));
  document.querySelectorAll('section.tab').forEach((s) =>
    s.classList.toggle('active', s.id === 'tab-' + name));
}

document.querySelectorAll('nav.tabs button').forEach((b) =>
  b.addEventListener('click', () => showTab(b.dataset.tab)));

// --- settings -------------------------------------------------------------

async function loadConfig() {
  const cfg = await api('GET', '/api/config');
  $('apiUrl').value = cfg.apiUrl;
  $('apiKey').value = cfg.apiKey;
  $('model').value = cfg.model;
}

$('saveConfig').addEventListener('click', (e) => busy(e.target, async () => {
  try {
    await api('PUT', '/api/config', {
      apiUrl: $('apiUrl').value, apiKey: $('apiKey').value, model: $('model').value,
    });
    toast('API settings saved', true);
  } catch (err) { toast(err.message, false); }
}));

$('testConfig').addEventListener('click', (e) => busy(e.target, async () => {
  $('connStatus').textContent = 'testing...';
  try {
    await api('POST', '/api/config/test');
    $('connStatus').textContent = 'connected';
    toast('Connection test succeeded', true);
  } catch (err) {
    $('connStatus').textContent = 'failed';
    toast(err.message, false);
  }
}));

// --- samples --------------------------------------------------------------

function renderSamples(data) {
  $('countHigh').textContent = 'high: ' + data.counts.high;
  $('countLow').textContent = 'low: ' + data.counts.low;
  const list = $('sampleList');
  list.innerHTML = '';
  if (data.samples.length === 0) {
    list.appendChild(el('div', 'empty', 'No samples yet. Add some copy to analyze.'));
    return;
  }
  data.samples.forEach((s) => {
    const row = el('div', 'sample');
    const body = el('div', 'text');
    body.appendChild(el('span', 'badge ' + s.type, s.type === 'high' ? 'high' : 'low'));
    body.appendChild(document.createTextNode(' ' + s.content));
    body.appendChild(el('div', 'meta', new Date(s.timestamp).toLocaleString()));
    const del = el('button', null, 'Delete');
    del.addEventListener('click', async () => {
      try {
        await api('DELETE', '/api/samples/' + encodeURIComponent(s.id));
        await loadSamples();
      } catch (err) { toast(err.message, false); }
    });
    row.appendChild(body);
    row.appendChild(del);
    list.appendChild(row);
  });
}

async function loadSamples() {
  renderSamples(await api('GET', '/api/samples'));
}

$('addSample').addEventListener('click', (e) => busy(e.target, async () => {
  const label = document.querySelector('input[name=label]:checked').value;
  try {
    await api('POST', '/api/samples', { content: $('sampleContent').value, label });
    $('sampleContent').value = '';
    await loadSamples();
    toast('Sample added', true);
  } catch (err) { toast(err.message, false); }
}));

$('runAnalysis').addEventListener('click', (e) => busy(e.target, async () => {
  try {
    analysis = await api('POST', '/api/analyze');
    renderAnalysis();
    toast('Feature analysis complete', true);
    showTab('analysis');
  } catch (err) { toast(err.message, false); }
}));

// --- analysis -------------------------------------------------------------

function renderAnalysis() {
  const view = $('analysisView');
  view.innerHTML = '';
  if (!analysis) {
    view.appendChild(el('div', 'card empty', 'Run a feature analysis from the Samples tab first.'));
  } else {
    const grid = el('div', 'grid');
    grid.appendChild(listCard('High-converting features', analysis.highFeatures));
    grid.appendChild(listCard('Low-converting features', analysis.lowFeatures));
    view.appendChild(grid);
    view.appendChild(listCard('Key differences', analysis.keyDifferences));
    view.appendChild(listCard('Recommendations', analysis.recommendations));
  }
  $('optimizeGate').innerHTML = '';
  if (analysis) {
    $('optimizeForm').style.display = '';
  } else {
    $('optimizeForm').style.display = 'none';
    $('optimizeGate').appendChild(el('div', 'card empty', 'Complete a feature analysis before optimizing copy.'));
  }
}

// --- optimization ---------------------------------------------------------

$('runOptimize').addEventListener('click', (e) => busy(e.target, async () => {
  try {
    const r = await api('POST', '/api/optimize', { content: $('optimizeContent').value });
    const view = $('optimizeView');
    view.innerHTML = '';
    const scoreCard = el('div', 'card');
    scoreCard.appendChild(el('h2', null, 'Conversion score'));
    scoreCard.appendChild(el('div', 'score ' + r.rating, r.score + ' / 100'));
    scoreCard.appendChild(el('div', 'hint', r.rating));
    view.appendChild(scoreCard);
    const grid = el('div', 'grid');
    grid.appendChild(listCard('Strengths', r.strengths));
    grid.appendChild(listCard('Weaknesses', r.weaknesses));
    view.appendChild(grid);
    view.appendChild(listCard('Suggestions', r.suggestions));
    const opt = el('div', 'card');
    opt.appendChild(el('h2', null, 'Optimized version'));
    opt.appendChild(el('div', 'optimized', r.optimizedVersion));
    view.appendChild(opt);
    toast('Optimization complete', true);
  } catch (err) { toast(err.message, false); }
}));

// --- boot -----------------------------------------------------------------

(async () => {
  try {
    await Promise.all([loadConfig(), loadSamples()]);
    analysis = (await api('GET', '/api/analysis')).analysis;
  } catch (err) { toast(err.message, false); }
  renderAnalysis();
})();
</script>
</body>
</html>
"##;
